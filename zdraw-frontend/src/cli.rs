use std::io::{self, BufRead, Write};

use tracing::{info, warn};
use zdraw_config::AppConfig;
use zdraw_core::document::{Document, Entity};
use zdraw_core::geometry::Point3;
use zdraw_engine::command::{CommandBus, CommandContext, CommandRequest};
use zdraw_engine::construct::{ConstructionOptions, PromptText};
use zdraw_engine::scene::Scene;

use crate::errors::FrontendError;
use crate::prompter::ConsolePrompter;

/// 把应用配置映射为构造命令的选项。
pub fn construction_options(config: &AppConfig) -> ConstructionOptions {
    let prompt = &config.prompt;
    ConstructionOptions {
        layer: config.construction.layer.clone(),
        prompts: PromptText {
            first_point: prompt.first_point.clone(),
            next_point: prompt.next_point.clone(),
            next_point_or_close: prompt.next_point_or_close.clone(),
            undo_keyword: prompt.undo_keyword.clone(),
            close_keyword: prompt.close_keyword.clone(),
        },
    }
}

/// 命令行会话：逐行读取命令并分派，直到 `quit` 或输入结束。返回会话结束时的场景。
pub fn run_session<R: BufRead, W: Write>(
    config: &AppConfig,
    input: &mut R,
    output: &mut W,
) -> Result<Scene, FrontendError> {
    let bus = CommandBus::with_options(construction_options(config));
    let mut scene = Scene::new();

    let mut commands: Vec<&str> = bus.available_commands().copied().collect();
    commands.sort_unstable();
    writeln!(output, "支持的命令: {}, list, quit", commands.join(", "))?;

    loop {
        write!(output, "命令: ")?;
        output.flush()?;
        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }
        let Some(request) = CommandRequest::parse(&line) else {
            continue;
        };

        match request.name.as_str() {
            "quit" | "exit" => break,
            "list" => print_document(scene.document(), output)?,
            _ => {
                let response = {
                    let mut prompter = ConsolePrompter::new(&mut *input, &mut *output);
                    let mut context = CommandContext {
                        scene: &mut scene,
                        prompter: &mut prompter,
                    };
                    bus.dispatch(&request, &mut context)
                };
                if response.success {
                    info!(command = %request.name, "命令执行完成");
                } else {
                    warn!(command = %request.name, message = ?response.message, "命令执行失败");
                }
                if let Some(message) = &response.message {
                    writeln!(output, "{message}")?;
                }
            }
        }
    }

    info!(
        entity_count = scene.document().entity_count(),
        "命令行会话结束"
    );
    Ok(scene)
}

fn print_document<W: Write>(document: &Document, output: &mut W) -> io::Result<()> {
    writeln!(output, "当前文档实体：")?;
    for (id, entity) in document.entities() {
        match entity {
            Entity::Line(line) => {
                writeln!(
                    output,
                    "  - 线段 #{}, Layer={}, 起点={}, 终点={}",
                    id.get(),
                    line.layer,
                    format_point(line.start),
                    format_point(line.end)
                )?;
            }
            Entity::Polyline(polyline) => {
                let coords: Vec<String> = polyline
                    .vertices
                    .iter()
                    .map(|vertex| {
                        let pos = vertex.position;
                        format!("({:.2}, {:.2})", pos.x(), pos.y())
                    })
                    .collect();
                writeln!(
                    output,
                    "  - 多段线 #{}, Layer={}, 标高={:.2}, 顶点数={}, 闭合={}, 顶点={}",
                    id.get(),
                    polyline.layer,
                    polyline.elevation,
                    polyline.vertices.len(),
                    if polyline.is_closed { "是" } else { "否" },
                    coords.join(" -> ")
                )?;
            }
        }
    }
    Ok(())
}

fn format_point(point: Point3) -> String {
    format!("({:.2}, {:.2}, {:.2})", point.x(), point.y(), point.z())
}
