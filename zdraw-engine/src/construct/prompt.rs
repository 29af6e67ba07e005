use tracing::trace;
use zdraw_core::geometry::{Frame, Point3};

use super::sequence::PointSequence;
use crate::errors::{ConstructionError, PromptError};
use crate::host::{PointPrompter, PointRequest, PromptReply};

/// 取点循环中可用的关键字。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Undo,
    Close,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptMessage {
    FirstPoint,
    NextPoint,
    NextPointOrClose,
}

/// 某一时刻的提示配置，仅由当前点数决定。
#[derive(Debug, Clone, PartialEq)]
pub struct PromptStep {
    pub message: PromptMessage,
    pub anchor: Option<Point3>,
    pub keywords: &'static [Keyword],
}

/// 闭合至少需要三个点，否则得到退化图形。
pub const MIN_POINTS_TO_CLOSE: usize = 3;

pub fn next_prompt_step(points: &PointSequence) -> PromptStep {
    match points.count() {
        0 => PromptStep {
            message: PromptMessage::FirstPoint,
            anchor: None,
            keywords: &[],
        },
        count if count < MIN_POINTS_TO_CLOSE => PromptStep {
            message: PromptMessage::NextPoint,
            anchor: points.last(),
            keywords: &[Keyword::Undo],
        },
        _ => PromptStep {
            message: PromptMessage::NextPointOrClose,
            anchor: points.last(),
            keywords: &[Keyword::Undo, Keyword::Close],
        },
    }
}

/// 提示文字与关键字标签，可由配置覆盖。
#[derive(Debug, Clone, PartialEq)]
pub struct PromptText {
    pub first_point: String,
    pub next_point: String,
    pub next_point_or_close: String,
    pub undo_keyword: String,
    pub close_keyword: String,
}

impl Default for PromptText {
    fn default() -> Self {
        Self {
            first_point: "指定第一个点: ".to_string(),
            next_point: "指定下一点: ".to_string(),
            next_point_or_close: "指定下一点或 ".to_string(),
            undo_keyword: "Undo".to_string(),
            close_keyword: "Close".to_string(),
        }
    }
}

impl PromptText {
    pub fn message(&self, message: PromptMessage) -> &str {
        match message {
            PromptMessage::FirstPoint => &self.first_point,
            PromptMessage::NextPoint => &self.next_point,
            PromptMessage::NextPointOrClose => &self.next_point_or_close,
        }
    }

    pub fn keyword_label(&self, keyword: Keyword) -> &str {
        match keyword {
            Keyword::Undo => &self.undo_keyword,
            Keyword::Close => &self.close_keyword,
        }
    }

    /// 按标签查找启用的关键字，忽略大小写。
    fn resolve(&self, label: &str, enabled: &[Keyword]) -> Option<Keyword> {
        enabled
            .iter()
            .copied()
            .find(|keyword| self.keyword_label(*keyword).eq_ignore_ascii_case(label))
    }

    /// 生成取点请求，`frame` 为当前生效的工作坐标系。
    pub fn render(&self, step: &PromptStep, frame: Frame) -> PointRequest {
        PointRequest {
            message: self.message(step.message).to_string(),
            anchor: step.anchor,
            frame,
            keywords: step
                .keywords
                .iter()
                .map(|keyword| self.keyword_label(*keyword).to_string())
                .collect(),
            allow_none: false,
        }
    }
}

/// 用户一次输入的解析结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InputEvent {
    Accepted(Point3),
    Keyword(Keyword),
    Cancelled,
}

/// 取点驱动：把提示配置交给宿主的取点接口，并把回复映射为输入事件。
pub struct PromptDriver<'a> {
    prompter: &'a mut dyn PointPrompter,
    text: &'a PromptText,
}

impl<'a> PromptDriver<'a> {
    pub fn new(prompter: &'a mut dyn PointPrompter, text: &'a PromptText) -> Self {
        Self { prompter, text }
    }

    pub fn solicit(
        &mut self,
        step: &PromptStep,
        frame: Frame,
    ) -> Result<InputEvent, ConstructionError> {
        let request = self.text.render(step, frame);
        trace!(message = %request.message, keywords = ?request.keywords, "请求输入");
        let event = match self.prompter.ask_point(&request)? {
            PromptReply::Point(point) => InputEvent::Accepted(point),
            PromptReply::Keyword(label) => match self.text.resolve(&label, step.keywords) {
                Some(keyword) => InputEvent::Keyword(keyword),
                None => return Err(PromptError::UnknownKeyword(label).into()),
            },
            PromptReply::Cancel => InputEvent::Cancelled,
        };
        Ok(event)
    }

    pub fn report(&mut self, message: &str) {
        self.prompter.write_message(message);
    }
}
