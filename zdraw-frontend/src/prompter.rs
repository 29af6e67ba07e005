use std::io::{BufRead, Write};

use tracing::{trace, warn};
use zdraw_core::geometry::{Frame, Point3, Vector3};
use zdraw_engine::errors::PromptError;
use zdraw_engine::host::{PointPrompter, PointRequest, PromptReply};

/// 基于文本流的取点交互。
///
/// 输入格式：`x,y[,z]` 为请求所带工作坐标系下的坐标，`@dx,dy[,dz]` 为相对橡皮筋基点的增量，
/// 增量方向同样按工作坐标系解释；
/// 关键字可输入全称或其中大写字母组成的缩写（忽略大小写）；空行、`esc` 或输入结束表示取消。
pub struct ConsolePrompter<'a, R, W> {
    input: &'a mut R,
    output: &'a mut W,
}

impl<'a, R: BufRead, W: Write> ConsolePrompter<'a, R, W> {
    pub fn new(input: &'a mut R, output: &'a mut W) -> Self {
        Self { input, output }
    }

    fn render(request: &PointRequest) -> String {
        let mut line = request
            .message
            .trim_end()
            .trim_end_matches([':', '：'])
            .to_string();
        if !request.keywords.is_empty() {
            if !line.is_empty() {
                line.push(' ');
            }
            line.push('[');
            line.push_str(&request.keywords.join("/"));
            line.push(']');
        }
        line.push_str(": ");
        line
    }
}

impl<R: BufRead, W: Write> PointPrompter for ConsolePrompter<'_, R, W> {
    fn ask_point(&mut self, request: &PointRequest) -> Result<PromptReply, PromptError> {
        loop {
            write!(self.output, "{}", Self::render(request))?;
            self.output.flush()?;

            let mut line = String::new();
            if self.input.read_line(&mut line)? == 0 {
                return Ok(PromptReply::Cancel);
            }
            let text = line.trim();
            trace!(input = text, "控制台输入");
            if text.is_empty() || text.eq_ignore_ascii_case("esc") {
                return Ok(PromptReply::Cancel);
            }
            if let Some(label) = match_keyword(text, &request.keywords) {
                return Ok(PromptReply::Keyword(label.to_string()));
            }
            if let Some(point) = parse_point(text, request.anchor, &request.frame) {
                return Ok(PromptReply::Point(point));
            }
            writeln!(self.output, "无效的点或关键字: {text}")?;
        }
    }

    fn write_message(&mut self, message: &str) {
        if let Err(err) = writeln!(self.output, "{message}") {
            warn!(error = %err, "无法输出消息");
        }
    }
}

/// 关键字缩写：标签中的大写字母，例如 `annUler` -> `U`。
fn abbreviation(label: &str) -> Option<String> {
    let short: String = label.chars().filter(char::is_ascii_uppercase).collect();
    (!short.is_empty()).then_some(short)
}

fn match_keyword<'k>(text: &str, keywords: &'k [String]) -> Option<&'k str> {
    keywords
        .iter()
        .find(|label| {
            label.eq_ignore_ascii_case(text)
                || abbreviation(label).is_some_and(|short| short.eq_ignore_ascii_case(text))
        })
        .map(String::as_str)
}

/// 解析坐标输入，返回世界坐标。
fn parse_point(text: &str, anchor: Option<Point3>, frame: &Frame) -> Option<Point3> {
    let (relative, body) = match text.strip_prefix('@') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    let values = body
        .split(',')
        .map(|part| part.trim().parse::<f64>())
        .collect::<Result<Vec<_>, _>>()
        .ok()?;
    if !values.iter().all(|value| value.is_finite()) {
        return None;
    }
    let (x, y, z) = match values.as_slice() {
        [x, y] => (*x, *y, 0.0),
        [x, y, z] => (*x, *y, *z),
        _ => return None,
    };
    if relative {
        let base = anchor?;
        Some(base.translate(frame.direction_to_world(Vector3::new(x, y, z))))
    } else {
        Some(frame.to_world(Point3::new(x, y, z)))
    }
}
