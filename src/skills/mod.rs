//! 技能系统
//!
//! 技能（Skill）是绑定到文件名 glob 模式的处理器。监听器把"文件被修改"事件交给
//! `SkillsRegistry::dispatch`，命中的技能依次执行各自的副作用。
//!
//! 内置技能集合在编译期由 [`builtin_registry`] 显式列出：
//! ```text
//! *.md     -> seeker   (?AION / ?RALPH / TODO: RALPH)
//! *.txt    -> seeker
//! TODO.md  -> notes    (HEY AION:)
//! ```

mod notes;
mod registry;

use std::sync::Arc;

pub use notes::{pending_request, pending_trigger, SeekerSkill, TodoNotesSkill};
pub use registry::{FnSkill, SkillError, SkillHandler, SkillRegistration, SkillsRegistry};

use crate::config::SkillsSection;
use crate::llm::Cognition;
use crate::memory::Journal;

/// 构建内置技能注册表
pub fn builtin_registry(
    cognition: Arc<Cognition>,
    journal: Arc<Journal>,
    cfg: &SkillsSection,
) -> SkillsRegistry {
    let seeker: Arc<dyn SkillHandler> = Arc::new(
        SeekerSkill::new(cognition.clone(), journal.clone())
            .with_excluded_names(cfg.generic_note_excludes.clone()),
    );
    let notes: Arc<dyn SkillHandler> = Arc::new(TodoNotesSkill::new(cognition, journal));

    let mut registry = SkillsRegistry::new();
    registry
        .register("*.md", seeker.clone(), "seeker")
        .register("*.txt", seeker, "seeker")
        .register("TODO.md", notes, "notes");
    registry
}
