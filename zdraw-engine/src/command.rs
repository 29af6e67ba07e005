use std::collections::HashMap;

use crate::construct::{Construction, ConstructionContext, ConstructionOptions, ShapeKind};
use crate::host::PointPrompter;
use crate::scene::Scene;

#[derive(Debug, Clone)]
pub struct CommandRequest {
    pub name: String,
    pub args: Vec<String>,
}

impl CommandRequest {
    /// 解析一行命令文本：首个单词为命令名，其余为参数。
    pub fn parse(line: &str) -> Option<Self> {
        let mut words = line.split_whitespace();
        let name = words.next()?.to_ascii_lowercase();
        Some(Self {
            name,
            args: words.map(str::to_string).collect(),
        })
    }
}

#[derive(Debug, Clone)]
pub struct CommandResponse {
    pub success: bool,
    pub message: Option<String>,
}

impl CommandResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
        }
    }

    pub fn err(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

pub trait CommandHandler: Send + Sync {
    fn name(&self) -> &'static str;
    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse;
}

pub struct CommandContext<'a> {
    pub scene: &'a mut Scene,
    pub prompter: &'a mut dyn PointPrompter,
}

pub struct CommandBus {
    handlers: HashMap<&'static str, Box<dyn CommandHandler>>,
}

impl CommandBus {
    pub fn new() -> Self {
        Self::with_options(ConstructionOptions::default())
    }

    /// 以给定的图层与提示文字注册构造命令。
    pub fn with_options(options: ConstructionOptions) -> Self {
        let mut bus = Self {
            handlers: HashMap::new(),
        };
        bus.register(ConstructCommand::new(ShapeKind::Chain, options.clone()));
        bus.register(ConstructCommand::new(ShapeKind::Polyline, options));
        bus
    }

    pub fn register<H: CommandHandler + 'static>(&mut self, handler: H) {
        self.handlers.insert(handler.name(), Box::new(handler));
    }

    pub fn dispatch(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        if let Some(handler) = self.handlers.get(request.name.as_str()) {
            handler.execute(request, context)
        } else {
            CommandResponse::err(format!("未知命令: {}", request.name))
        }
    }

    pub fn available_commands(&self) -> impl Iterator<Item = &&'static str> {
        self.handlers.keys()
    }
}

impl Default for CommandBus {
    fn default() -> Self {
        Self::new()
    }
}

/// 交互构造命令。可选的第一个参数指定目标图层。
struct ConstructCommand {
    construction: Construction,
}

impl ConstructCommand {
    fn new(kind: ShapeKind, options: ConstructionOptions) -> Self {
        Self {
            construction: Construction::new(kind, options),
        }
    }
}

impl CommandHandler for ConstructCommand {
    fn name(&self) -> &'static str {
        self.construction.kind().command_name()
    }

    fn execute(
        &self,
        request: &CommandRequest,
        context: &mut CommandContext<'_>,
    ) -> CommandResponse {
        let construction = match request.args.first() {
            Some(layer) => self.construction.on_layer(layer.as_str()),
            None => self.construction.clone(),
        };
        let (document, ucs) = context.scene.parts_mut();
        let outcome = construction.run(ConstructionContext {
            prompter: &mut *context.prompter,
            store: document,
            frames: ucs,
        });

        let kept = outcome.entities.len();
        match (&outcome.error, outcome.is_closed()) {
            (Some(err), _) => CommandResponse::err(format!("{err}（保留 {kept} 个实体）")),
            (None, true) => CommandResponse::ok(format!("图形已闭合，共 {kept} 个实体")),
            (None, false) => CommandResponse::ok(format!("已取消，保留 {kept} 个实体")),
        }
    }
}
