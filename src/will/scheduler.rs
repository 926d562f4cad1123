//! Will：自主调度循环
//!
//! 每轮：检查计时器（反思 / 社交广播 / 重新定位）→ 队列为空时规划目标 → 弹出并执行一个动作。
//! 单轮的任何错误只记日志，循环继续；只有取消令牌能让循环退出。

use std::collections::VecDeque;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::config::WillSection;
use crate::core::AgentError;
use crate::integrations::SocialStrategy;
use crate::memory::{RecentMemory, Reflection, THOUGHTS_FILE};
use crate::tools::location;
use crate::will::{tempo, Action, Executor, Planner};

/// 规划时读取的近期智慧长度
const RECENT_MEMORY_CHARS: usize = 1500;
/// 广播时读取的近期想法长度
const BROADCAST_CONTEXT_CHARS: usize = 2000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timer {
    Reflection,
    Broadcast,
    Resync,
}

/// 各周期动作上次触发的时间；只由调度循环修改
#[derive(Debug, Clone)]
pub struct TimerState {
    last_reflection: Instant,
    last_broadcast: Instant,
    last_resync: Instant,
    reflection_every: Duration,
    broadcast_every: Duration,
    resync_every: Duration,
}

impl TimerState {
    pub fn new(cfg: &WillSection, now: Instant) -> Self {
        Self {
            last_reflection: now,
            last_broadcast: now,
            last_resync: now,
            reflection_every: Duration::from_secs(cfg.reflection_interval_secs),
            broadcast_every: Duration::from_secs(cfg.broadcast_interval_secs),
            resync_every: Duration::from_secs(cfg.resync_interval_secs),
        }
    }

    /// 超过间隔的计时器，按 反思、广播、重新定位 顺序
    pub fn due(&self, now: Instant) -> Vec<Timer> {
        let elapsed = |last: Instant| now.saturating_duration_since(last);
        let mut due = Vec::new();
        if elapsed(self.last_reflection) > self.reflection_every {
            due.push(Timer::Reflection);
        }
        if elapsed(self.last_broadcast) > self.broadcast_every {
            due.push(Timer::Broadcast);
        }
        if elapsed(self.last_resync) > self.resync_every {
            due.push(Timer::Resync);
        }
        due
    }

    pub fn reset(&mut self, timer: Timer, now: Instant) {
        match timer {
            Timer::Reflection => self.last_reflection = now,
            Timer::Broadcast => self.last_broadcast = now,
            Timer::Resync => self.last_resync = now,
        }
    }
}

pub struct Will {
    root: PathBuf,
    cfg: WillSection,
    planner: Planner,
    executor: Executor,
    reflection: Reflection,
    recent: RecentMemory,
    strategy: SocialStrategy,
    queue: VecDeque<String>,
    timers: TimerState,
    location: String,
    http_timeout_secs: u64,
}

impl Will {
    pub fn new(root: impl Into<PathBuf>, cfg: &WillSection, executor: Executor) -> Self {
        let deps = executor.collaborators().clone();
        Self {
            root: root.into(),
            cfg: cfg.clone(),
            planner: Planner::new(deps.cognition.clone(), cfg.goal_count),
            reflection: Reflection::new(deps.cognition.clone(), deps.journal.clone()),
            recent: RecentMemory::new(deps.journal.clone(), RECENT_MEMORY_CHARS),
            strategy: SocialStrategy::new(deps.cognition),
            executor,
            queue: VecDeque::new(),
            timers: TimerState::new(cfg, Instant::now()),
            location: "Location unknown.".to_string(),
            http_timeout_secs: 15,
        }
    }

    pub fn with_http_timeout(mut self, secs: u64) -> Self {
        self.http_timeout_secs = secs;
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn pending(&self) -> &VecDeque<String> {
        &self.queue
    }

    pub fn enqueue(&mut self, task: impl Into<String>) {
        self.queue.push_back(task.into());
    }

    /// 重新查询位置描述并缓存
    pub async fn refresh_location(&mut self) {
        self.location = location::describe(self.http_timeout_secs).await;
        tracing::debug!("Anchor refreshed: {}", self.location.replace('\n', " | "));
    }

    /// 队列为空时才咨询认知端口；返回新增动作数
    pub async fn plan_goals(&mut self) -> usize {
        if !self.queue.is_empty() {
            return 0;
        }

        let mut context = format!(
            "Root: {}\nStatus: Idle.\n{}",
            self.root.display(),
            tempo::current_context(chrono::Local::now(), &self.location)
        );
        if let Some(memory) = self.recent.snapshot().await {
            context.push_str(&format!("\nRecent Memory:\n{}", memory));
        }

        for goal in self.planner.goals(&context).await {
            let actions = self.planner.decompose(&goal).await;
            self.queue.extend(actions);
        }

        let planned = self.queue.len();
        if planned > 0 {
            tracing::info!("The Architect has foreseen {} new actions.", planned);
        }
        planned
    }

    /// 单轮：计时器 → 规划 → 执行至多一个动作；返回执行了的动作
    pub async fn tick(&mut self) -> Result<Option<Action>, AgentError> {
        self.tick_at(Instant::now()).await
    }

    pub async fn tick_at(&mut self, now: Instant) -> Result<Option<Action>, AgentError> {
        for timer in self.timers.due(now) {
            self.timers.reset(timer, now);
            self.fire(timer).await?;
        }

        self.plan_goals().await;

        let Some(task) = self.queue.pop_front() else {
            return Ok(None);
        };
        tracing::info!("Executing Action: {}", task);
        let action = Action::parse(&task);
        self.executor.execute(&action).await?;
        Ok(Some(action))
    }

    async fn fire(&mut self, timer: Timer) -> Result<(), AgentError> {
        match timer {
            Timer::Reflection => {
                self.reflection.reflect().await?;
            }
            Timer::Broadcast => self.broadcast_insight().await,
            Timer::Resync => self.refresh_location().await,
        }
        Ok(())
    }

    /// 把近期想法加工成帖子并广播
    async fn broadcast_insight(&self) {
        let deps = self.executor.collaborators();
        if deps.social.is_empty() {
            return;
        }
        let recent = deps.journal.tail(THOUGHTS_FILE, BROADCAST_CONTEXT_CHARS).await;
        if recent.trim().is_empty() {
            tracing::debug!("Nothing to broadcast yet");
            return;
        }
        let parts = self.strategy.generate_post(&recent).await;
        if parts.is_empty() {
            return;
        }
        // 串按顺序逐段发出，每段都在字符上限内
        for part in &parts {
            deps.social.broadcast(part).await;
        }
    }

    fn next_sleep(&self) -> Duration {
        let (lo, hi) = if self.cfg.min_sleep_secs <= self.cfg.max_sleep_secs {
            (self.cfg.min_sleep_secs, self.cfg.max_sleep_secs)
        } else {
            (self.cfg.max_sleep_secs, self.cfg.min_sleep_secs)
        };
        Duration::from_secs(rand::thread_rng().gen_range(lo..=hi))
    }

    /// 主循环：随机休眠后执行一轮，直到取消
    pub async fn run(mut self, cancel: CancellationToken) {
        tracing::info!("Will Engine: THE ARCHITECT IS AWAKE.");
        loop {
            let sleep = self.next_sleep();
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(sleep) => {}
            }

            match self.tick().await {
                Ok(Some(action)) => tracing::debug!("Action done: {}", action),
                Ok(None) => {}
                Err(e) => tracing::error!("Will Error: {}", e),
            }
        }
        tracing::info!("Will Engine stopped ({} action(s) left pending)", self.queue.len());
    }
}
