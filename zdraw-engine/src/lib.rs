pub mod command;
pub mod construct;
pub mod host;

pub mod errors {
    use thiserror::Error;

    /// 实体存储拒绝变更时的错误。
    #[derive(Debug, Error)]
    pub enum StoreError {
        #[error("entity with id {0} not found")]
        EntityNotFound(u64),
        #[error("entity {id} ({kind}) does not accept vertex mutations")]
        UnsupportedMutation { id: u64, kind: &'static str },
        #[error("polyline {0} has no vertex to remove")]
        EmptyPolyline(u64),
        #[error("store rejected the change: {0}")]
        Rejected(String),
    }

    /// 取点交互失败。
    #[derive(Debug, Error)]
    pub enum PromptError {
        #[error("prompt input failed: {0}")]
        Io(#[from] std::io::Error),
        #[error("keyword `{0}` is not available at this prompt")]
        UnknownKeyword(String),
        #[error("prompter failed: {0}")]
        Rejected(String),
    }

    /// 构造流程中的错误。`EmptySequence` 与 `DegenerateClose` 由流程自身拦截，
    /// 其余两类在控制器边界报告给用户并终止本次操作。
    #[derive(Debug, Error)]
    pub enum ConstructionError {
        #[error("point sequence is empty, nothing to undo")]
        EmptySequence,
        #[error("closing requires at least 3 points, got {0}")]
        DegenerateClose(usize),
        #[error("commit failed: {0}")]
        CommitFailure(#[from] StoreError),
        #[error("prompt failed: {0}")]
        PrompterFailure(#[from] PromptError),
    }
}

pub mod scene {
    use zdraw_core::document::{Document, Entity, EntityId};
    use zdraw_core::geometry::Frame;

    /// 引擎层的宿主状态：文档与当前工作坐标系（UCS）。
    ///
    /// 工作坐标系作为显式字段保存，构造命令通过 [`Scene::parts_mut`] 同时借出文档与坐标系，
    /// 不依赖任何进程级全局状态。
    #[derive(Debug)]
    pub struct Scene {
        document: Document,
        ucs: Frame,
    }

    impl Scene {
        pub fn new() -> Self {
            Self {
                document: Document::new(),
                ucs: Frame::world(),
            }
        }

        /// 使用现有文档初始化场景。
        pub fn with_document(document: Document) -> Self {
            Self {
                document,
                ucs: Frame::world(),
            }
        }

        /// 清空文档并恢复世界坐标系。
        pub fn reset(&mut self) {
            self.document = Document::new();
            self.ucs = Frame::world();
        }

        #[inline]
        pub fn document(&self) -> &Document {
            &self.document
        }

        #[inline]
        pub fn document_mut(&mut self) -> &mut Document {
            &mut self.document
        }

        #[inline]
        pub fn ucs(&self) -> Frame {
            self.ucs
        }

        #[inline]
        pub fn set_ucs(&mut self, frame: Frame) {
            self.ucs = frame;
        }

        /// 同时可变借出文档与工作坐标系。
        #[inline]
        pub fn parts_mut(&mut self) -> (&mut Document, &mut Frame) {
            (&mut self.document, &mut self.ucs)
        }

        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.document.entity(id)
        }
    }

    impl Default for Scene {
        fn default() -> Self {
            Self::new()
        }
    }

}
