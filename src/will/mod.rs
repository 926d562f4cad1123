//! Will：自主驱动引擎
//!
//! IDLE（队列空）→ PLANNING（咨询认知端口得到目标并分解为动作）→ EXECUTING（一次一个）→ IDLE。
//! 任务队列只属于调度循环，监听线程不会触碰它。

mod action;
mod executor;
mod planner;
mod scheduler;
pub mod tempo;

pub use action::Action;
pub use executor::{Collaborators, Executor};
pub use planner::{extract_actions, parse_goals, Planner};
pub use scheduler::{Timer, TimerState, Will};
