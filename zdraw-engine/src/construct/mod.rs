//! 交互式线段链 / 多段线构造。
//!
//! 控制器 ([`Construction`]) 在一个循环中按当前点数生成提示、等待一次输入，
//! 再把输入同步应用到点序列与实体构造器上。工作坐标系由 [`FrameGuard`] 托管，
//! 无论闭合、取消还是出错都会恢复。

mod builder;
mod controller;
mod frame_guard;
mod prompt;
mod sequence;

pub use builder::{ChainBuilder, EntityBuilder, PolylineBuilder, ShapeKind};
pub use controller::{
    Construction, ConstructionContext, ConstructionOptions, ConstructionOutcome,
    ConstructionState,
};
pub use frame_guard::FrameGuard;
pub use prompt::{
    InputEvent, Keyword, MIN_POINTS_TO_CLOSE, PromptDriver, PromptMessage, PromptStep,
    PromptText, next_prompt_step,
};
pub use sequence::PointSequence;
