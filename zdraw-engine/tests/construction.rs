use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use zdraw_core::document::{Document, Entity, EntityId, Polyline};
use zdraw_core::geometry::{Frame, Point2, Point3, Vector3};
use zdraw_engine::construct::{
    Construction, ConstructionContext, ConstructionOptions, ConstructionOutcome,
    ConstructionState, ShapeKind,
};
use zdraw_engine::errors::{ConstructionError, PromptError, StoreError};
use zdraw_engine::host::{
    EntityMutation, EntityStore, FrameAccess, PointPrompter, PointRequest, PromptReply,
};

/// 按脚本回复的取点替身；脚本耗尽后返回取消。
struct ScriptedPrompter {
    replies: VecDeque<Result<PromptReply, PromptError>>,
    requests: Vec<PointRequest>,
    messages: Vec<String>,
    frame_watch: Option<Rc<Cell<Frame>>>,
    frames_seen: Vec<Frame>,
}

impl ScriptedPrompter {
    fn new(replies: impl IntoIterator<Item = PromptReply>) -> Self {
        Self {
            replies: replies.into_iter().map(Ok).collect(),
            requests: Vec::new(),
            messages: Vec::new(),
            frame_watch: None,
            frames_seen: Vec::new(),
        }
    }

    fn failing_after(replies: impl IntoIterator<Item = PromptReply>, reason: &str) -> Self {
        let mut prompter = Self::new(replies);
        prompter
            .replies
            .push_back(Err(PromptError::Rejected(reason.to_string())));
        prompter
    }
}

impl PointPrompter for ScriptedPrompter {
    fn ask_point(&mut self, request: &PointRequest) -> Result<PromptReply, PromptError> {
        self.requests.push(request.clone());
        if let Some(watched) = &self.frame_watch {
            self.frames_seen.push(watched.get());
        }
        self.replies.pop_front().unwrap_or(Ok(PromptReply::Cancel))
    }

    fn write_message(&mut self, message: &str) {
        self.messages.push(message.to_string());
    }
}

/// 包装文档的存储替身，可在指定次数后拒绝提交。
struct FlakyStore {
    document: Document,
    appends_left: Option<usize>,
    reject_updates: bool,
    reject_erase: bool,
}

impl FlakyStore {
    fn new() -> Self {
        Self {
            document: Document::new(),
            appends_left: None,
            reject_updates: false,
            reject_erase: false,
        }
    }
}

impl EntityStore for FlakyStore {
    fn append_entity(&mut self, entity: Entity) -> Result<EntityId, StoreError> {
        if let Some(left) = self.appends_left.as_mut() {
            if *left == 0 {
                return Err(StoreError::Rejected("database is read-only".to_string()));
            }
            *left -= 1;
        }
        self.document.append_entity(entity)
    }

    fn update_entity(
        &mut self,
        id: EntityId,
        mutations: &[EntityMutation],
    ) -> Result<(), StoreError> {
        if self.reject_updates {
            return Err(StoreError::Rejected("entity is locked".to_string()));
        }
        self.document.update_entity(id, mutations)
    }

    fn erase_entity(&mut self, id: EntityId) -> Result<Entity, StoreError> {
        if self.reject_erase {
            return Err(StoreError::Rejected("entity is locked".to_string()));
        }
        self.document.erase_entity(id)
    }
}

/// 与取点替身共享的工作坐标系，记录每次写入。
struct SharedFrames {
    current: Rc<Cell<Frame>>,
    writes: Vec<Frame>,
}

impl SharedFrames {
    fn new(frame: Frame) -> Self {
        Self {
            current: Rc::new(Cell::new(frame)),
            writes: Vec::new(),
        }
    }
}

impl FrameAccess for SharedFrames {
    fn frame(&self) -> Frame {
        self.current.get()
    }

    fn set_frame(&mut self, frame: Frame) {
        self.current.set(frame);
        self.writes.push(frame);
    }
}

fn point(x: f64, y: f64, z: f64) -> PromptReply {
    PromptReply::Point(Point3::new(x, y, z))
}

fn keyword(label: &str) -> PromptReply {
    PromptReply::Keyword(label.to_string())
}

fn square() -> Vec<PromptReply> {
    vec![
        point(0.0, 0.0, 0.0),
        point(10.0, 0.0, 0.0),
        point(10.0, 10.0, 0.0),
        point(0.0, 10.0, 0.0),
    ]
}

fn run(
    kind: ShapeKind,
    prompter: &mut ScriptedPrompter,
    store: &mut dyn EntityStore,
    ucs: &mut Frame,
) -> ConstructionOutcome {
    Construction::new(kind, ConstructionOptions::default()).run(ConstructionContext {
        prompter,
        store,
        frames: ucs,
    })
}

fn polyline(document: &Document, id: EntityId) -> &Polyline {
    match document.entity(id) {
        Some(Entity::Polyline(polyline)) => polyline,
        other => panic!("expected polyline, got {other:?}"),
    }
}

fn line_count(document: &Document) -> usize {
    document
        .entities()
        .filter(|(_, entity)| matches!(entity, Entity::Line(_)))
        .count()
}

#[test]
fn closing_chain_commits_one_segment_per_point() {
    for n in 3..=6 {
        let mut replies: Vec<PromptReply> = (0..n)
            .map(|i| {
                let angle = i as f64 / n as f64 * std::f64::consts::TAU;
                point(angle.cos(), angle.sin(), 0.0)
            })
            .collect();
        replies.push(keyword("Close"));

        let mut prompter = ScriptedPrompter::new(replies);
        let mut document = Document::new();
        let mut ucs = Frame::world();
        let outcome = run(ShapeKind::Chain, &mut prompter, &mut document, &mut ucs);

        assert!(outcome.is_closed());
        assert_eq!(outcome.state, ConstructionState::Closed);
        assert_eq!(outcome.entities.len(), n);
        assert_eq!(line_count(&document), n);
        assert_eq!(ucs, Frame::world());
    }
}

#[test]
fn closing_chain_returns_to_the_first_point() {
    let mut replies = square();
    replies.push(keyword("close"));
    let mut prompter = ScriptedPrompter::new(replies);
    let mut document = Document::new();
    let mut ucs = Frame::world();
    let outcome = run(ShapeKind::Chain, &mut prompter, &mut document, &mut ucs);

    let last = outcome.entities.last().copied().expect("closing segment");
    match document.entity(last) {
        Some(Entity::Line(line)) => {
            assert_eq!(line.start, Point3::new(0.0, 10.0, 0.0));
            assert_eq!(line.end, Point3::new(0.0, 0.0, 0.0));
        }
        other => panic!("expected line, got {other:?}"),
    }
}

#[test]
fn closing_square_polyline_duplicates_first_vertex() {
    let mut replies = square();
    replies.push(keyword("Close"));
    let mut prompter = ScriptedPrompter::new(replies);
    let mut document = Document::new();
    let mut ucs = Frame::world();
    let outcome = run(ShapeKind::Polyline, &mut prompter, &mut document, &mut ucs);

    assert!(outcome.is_closed());
    assert_eq!(outcome.entities.len(), 1);
    let shape = polyline(&document, outcome.entities[0]);
    let positions: Vec<Point2> = shape.vertices.iter().map(|v| v.position).collect();
    assert_eq!(
        positions,
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(10.0, 0.0),
            Point2::new(10.0, 10.0),
            Point2::new(0.0, 10.0),
            Point2::new(0.0, 0.0),
        ]
    );
    assert!(shape.is_closed);
    assert!(shape.elevation.abs() < f64::EPSILON);
}

#[test]
fn prompts_follow_the_point_count() {
    let mut replies = square();
    replies.push(keyword("Close"));
    let mut prompter = ScriptedPrompter::new(replies);
    let mut document = Document::new();
    let mut ucs = Frame::world();
    run(ShapeKind::Chain, &mut prompter, &mut document, &mut ucs);

    let requests = &prompter.requests;
    assert_eq!(requests.len(), 5);
    assert!(requests[0].anchor.is_none());
    assert!(requests[0].keywords.is_empty());
    assert_eq!(requests[1].keywords, vec!["Undo"]);
    assert_eq!(requests[1].anchor, Some(Point3::new(0.0, 0.0, 0.0)));
    assert_eq!(requests[2].keywords, vec!["Undo"]);
    assert_eq!(requests[3].keywords, vec!["Undo", "Close"]);
    assert_eq!(requests[4].anchor, Some(Point3::new(0.0, 10.0, 0.0)));
    assert!(requests.iter().all(|request| !request.allow_none));
}

#[test]
fn undo_right_after_first_point_leaves_only_degenerate_remnants() {
    let mut prompter = ScriptedPrompter::new([point(1.0, 1.0, 0.0), keyword("Undo")]);
    let mut document = Document::new();
    let mut ucs = Frame::world();
    let outcome = run(ShapeKind::Chain, &mut prompter, &mut document, &mut ucs);
    assert_eq!(outcome.state, ConstructionState::Cancelled);
    assert!(outcome.points.is_empty());
    assert!(outcome.entities.is_empty());
    assert_eq!(document.entity_count(), 0);

    let mut prompter = ScriptedPrompter::new([point(1.0, 1.0, 0.0), keyword("Undo")]);
    let mut document = Document::new();
    let outcome = run(ShapeKind::Polyline, &mut prompter, &mut document, &mut ucs);
    assert!(outcome.points.is_empty());
    assert_eq!(outcome.entities.len(), 1);
    assert!(polyline(&document, outcome.entities[0]).vertices.is_empty());
    // 序列清空后首个提示不再提供关键字
    assert!(prompter.requests[2].keywords.is_empty());
}

#[test]
fn consecutive_undos_invert_accepts() {
    let n = 5;
    for k in 0..=n {
        let accepts: Vec<PromptReply> = (0..n).map(|i| point(i as f64, (i * i) as f64, 0.0)).collect();
        let script: Vec<PromptReply> = accepts
            .iter()
            .cloned()
            .chain(std::iter::repeat_n(keyword("Undo"), k))
            .collect();

        let mut prompter = ScriptedPrompter::new(script.clone());
        let mut document = Document::new();
        let mut ucs = Frame::world();
        let outcome = run(ShapeKind::Chain, &mut prompter, &mut document, &mut ucs);
        assert_eq!(outcome.points.len(), n - k);
        assert_eq!(line_count(&document), (n - k).saturating_sub(1));
        assert_eq!(outcome.entities.len(), (n - k).saturating_sub(1));

        let mut prompter = ScriptedPrompter::new(script);
        let mut document = Document::new();
        let outcome = run(ShapeKind::Polyline, &mut prompter, &mut document, &mut ucs);
        assert_eq!(outcome.points.len(), n - k);
        let shape = polyline(&document, outcome.entities[0]);
        assert_eq!(shape.vertices.len(), n - k);
        for (vertex, accepted) in shape.vertices.iter().zip(&outcome.points) {
            assert_eq!(vertex.position, Point2::new(accepted.x(), accepted.y()));
        }
    }
}

#[test]
fn cancel_keeps_committed_prefix() {
    let points = square();
    for m in 0..=points.len() {
        let script: Vec<PromptReply> = points[..m]
            .iter()
            .cloned()
            .chain([PromptReply::Cancel])
            .collect();

        let mut prompter = ScriptedPrompter::new(script.clone());
        let mut document = Document::new();
        let mut ucs = Frame::world();
        let outcome = run(ShapeKind::Chain, &mut prompter, &mut document, &mut ucs);
        assert_eq!(outcome.state, ConstructionState::Cancelled);
        assert!(outcome.error.is_none());
        assert_eq!(line_count(&document), m.saturating_sub(1));
        assert_eq!(ucs, Frame::world());

        let mut prompter = ScriptedPrompter::new(script);
        let mut document = Document::new();
        let outcome = run(ShapeKind::Polyline, &mut prompter, &mut document, &mut ucs);
        assert_eq!(document.entity_count(), usize::from(m > 0));
        if m > 0 {
            let shape = polyline(&document, outcome.entities[0]);
            assert_eq!(shape.vertices.len(), m);
            assert!(!shape.is_closed);
        }
    }
}

#[test]
fn two_points_undo_then_cancel() {
    let script = [point(0.0, 0.0, 0.0), point(3.0, 0.0, 0.0), keyword("Undo")];

    let mut prompter = ScriptedPrompter::new(script.clone());
    let mut document = Document::new();
    let mut ucs = Frame::world();
    let outcome = run(ShapeKind::Chain, &mut prompter, &mut document, &mut ucs);
    assert_eq!(outcome.state, ConstructionState::Cancelled);
    assert_eq!(outcome.points, vec![Point3::new(0.0, 0.0, 0.0)]);
    assert_eq!(document.entity_count(), 0);

    let mut prompter = ScriptedPrompter::new(script);
    let mut document = Document::new();
    let outcome = run(ShapeKind::Polyline, &mut prompter, &mut document, &mut ucs);
    assert_eq!(polyline(&document, outcome.entities[0]).vertices.len(), 1);
}

#[test]
fn off_plane_first_point_displaces_frame_before_next_prompt() {
    let mut prompter =
        ScriptedPrompter::new([point(0.0, 0.0, 5.0), point(4.0, 0.0, 5.0), PromptReply::Cancel]);
    let mut frames = SharedFrames::new(Frame::world());
    prompter.frame_watch = Some(Rc::clone(&frames.current));
    let mut document = Document::new();

    let outcome = Construction::new(ShapeKind::Polyline, ConstructionOptions::default()).run(
        ConstructionContext {
            prompter: &mut prompter,
            store: &mut document,
            frames: &mut frames,
        },
    );

    assert_eq!(prompter.frames_seen.len(), 3);
    assert_eq!(prompter.frames_seen[0], Frame::world());
    assert_eq!(prompter.frames_seen[1].origin(), Point3::new(0.0, 0.0, 5.0));
    assert_eq!(prompter.frames_seen[1].normal(), Vector3::Z);
    assert_eq!(prompter.requests[0].frame, Frame::world());
    assert_eq!(prompter.requests[1].frame, prompter.frames_seen[1]);
    assert_eq!(prompter.requests[2].frame, prompter.frames_seen[2]);
    assert_eq!(frames.writes.len(), 2);
    assert_eq!(frames.writes[1], Frame::world());
    assert_eq!(frames.frame(), Frame::world());

    let shape = polyline(&document, outcome.entities[0]);
    assert!((shape.elevation - 5.0).abs() < f64::EPSILON);
    assert_eq!(shape.vertices[1].position, Point2::new(4.0, 0.0));
}

#[test]
fn polyline_in_rotated_frame_uses_frame_coordinates() {
    let side = Frame::new(Point3::new(1.0, 0.0, 0.0), Vector3::Y, Vector3::Z).expect("valid axes");
    let mut ucs = side;
    let mut prompter = ScriptedPrompter::new([
        point(3.0, 0.0, 0.0),
        point(3.0, 2.0, 0.0),
        point(3.0, 2.0, 2.0),
        keyword("Close"),
    ]);
    let mut document = Document::new();
    let outcome = run(ShapeKind::Polyline, &mut prompter, &mut document, &mut ucs);

    let shape = polyline(&document, outcome.entities[0]);
    assert!((shape.elevation - 2.0).abs() < 1e-12);
    assert_eq!(shape.normal, Vector3::X);
    let positions: Vec<Point2> = shape.vertices.iter().map(|v| v.position).collect();
    assert_eq!(
        positions,
        vec![
            Point2::new(0.0, 0.0),
            Point2::new(2.0, 0.0),
            Point2::new(2.0, 2.0),
            Point2::new(0.0, 0.0),
        ]
    );
    assert_eq!(ucs, side);
}

#[test]
fn commit_failure_is_reported_and_frame_restored() {
    let mut prompter = ScriptedPrompter::new([
        point(0.0, 0.0, 2.0),
        point(1.0, 0.0, 2.0),
        point(1.0, 1.0, 2.0),
        point(0.0, 1.0, 2.0),
    ]);
    let mut store = FlakyStore::new();
    store.appends_left = Some(1);
    let mut ucs = Frame::world();
    let outcome = run(ShapeKind::Chain, &mut prompter, &mut store, &mut ucs);

    assert!(matches!(
        outcome.error,
        Some(ConstructionError::CommitFailure(StoreError::Rejected(_)))
    ));
    assert_eq!(outcome.state, ConstructionState::Building);
    assert_eq!(outcome.points.len(), 2);
    assert_eq!(outcome.entities.len(), 1);
    assert_eq!(store.document.entity_count(), 1);
    assert_eq!(prompter.requests.len(), 3);
    assert_eq!(prompter.messages.len(), 1);
    assert!(prompter.messages[0].contains("database is read-only"));
    assert_eq!(ucs, Frame::world());
}

#[test]
fn failed_undo_retracts_nothing() {
    let mut prompter = ScriptedPrompter::new([
        point(0.0, 0.0, 0.0),
        point(1.0, 0.0, 0.0),
        keyword("Undo"),
    ]);
    let mut store = FlakyStore::new();
    store.reject_erase = true;
    let mut ucs = Frame::world();
    let outcome = run(ShapeKind::Chain, &mut prompter, &mut store, &mut ucs);

    assert!(matches!(outcome.error, Some(ConstructionError::CommitFailure(_))));
    assert_eq!(outcome.points.len(), 2);
    assert_eq!(outcome.entities.len(), 1);
    assert_eq!(store.document.entity_count(), 1);

    let mut prompter = ScriptedPrompter::new([point(0.0, 0.0, 0.0), point(1.0, 0.0, 0.0)]);
    let mut store = FlakyStore::new();
    store.reject_updates = true;
    let outcome = run(ShapeKind::Polyline, &mut prompter, &mut store, &mut ucs);
    assert!(matches!(outcome.error, Some(ConstructionError::CommitFailure(_))));
    assert_eq!(outcome.points.len(), 1);
    assert_eq!(polyline(&store.document, outcome.entities[0]).vertices.len(), 1);
}

#[test]
fn prompter_failure_is_reported_and_frame_restored() {
    let mut prompter =
        ScriptedPrompter::failing_after([point(0.0, 0.0, 3.0), point(2.0, 0.0, 3.0)], "widget lost");
    let mut document = Document::new();
    let mut ucs = Frame::world();
    let outcome = run(ShapeKind::Polyline, &mut prompter, &mut document, &mut ucs);

    assert!(matches!(
        outcome.error,
        Some(ConstructionError::PrompterFailure(PromptError::Rejected(_)))
    ));
    assert_eq!(prompter.messages.len(), 1);
    assert!(prompter.messages[0].contains("widget lost"));
    assert_eq!(polyline(&document, outcome.entities[0]).vertices.len(), 2);
    assert_eq!(ucs, Frame::world());
}

#[test]
fn close_is_not_offered_before_three_points() {
    let mut prompter = ScriptedPrompter::new([
        point(0.0, 0.0, 0.0),
        point(1.0, 0.0, 0.0),
        keyword("Close"),
    ]);
    let mut document = Document::new();
    let mut ucs = Frame::world();
    let outcome = run(ShapeKind::Chain, &mut prompter, &mut document, &mut ucs);

    assert!(matches!(
        outcome.error,
        Some(ConstructionError::PrompterFailure(PromptError::UnknownKeyword(_)))
    ));
    assert!(!outcome.is_closed());
    assert_eq!(line_count(&document), 1);
}

#[test]
fn localized_keyword_labels_are_honoured() {
    let options = ConstructionOptions {
        layer: "CONTOUR".to_string(),
        prompts: zdraw_engine::construct::PromptText {
            undo_keyword: "annUler".to_string(),
            close_keyword: "Clore".to_string(),
            ..Default::default()
        },
    };
    let mut replies = square();
    replies.insert(2, keyword("annUler"));
    replies.insert(3, point(10.0, 0.0, 0.0));
    replies.push(keyword("Clore"));

    let mut prompter = ScriptedPrompter::new(replies);
    let mut document = Document::new();
    let mut ucs = Frame::world();
    let outcome = Construction::new(ShapeKind::Chain, options).run(ConstructionContext {
        prompter: &mut prompter,
        store: &mut document,
        frames: &mut ucs,
    });

    assert!(outcome.is_closed());
    assert_eq!(line_count(&document), 4);
    assert!(
        document
            .entities()
            .all(|(_, entity)| entity.layer_name() == "CONTOUR")
    );
    assert_eq!(prompter.requests[4].keywords, vec!["annUler"]);
    assert_eq!(prompter.requests[5].keywords, vec!["annUler", "Clore"]);
}
