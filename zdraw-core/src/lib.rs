pub mod geometry {
    use glam::{DVec2, DVec3};
    use serde::{Deserialize, Serialize};

    /// 二维点，内部以 `glam::DVec2` 表示。多段线顶点均以工作平面内的二维坐标存储。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point2(pub DVec2);

    impl Point2 {
        #[inline]
        pub fn new(x: f64, y: f64) -> Self {
            Self(DVec2::new(x, y))
        }

        #[inline]
        pub fn from_vec(vec: DVec2) -> Self {
            Self(vec)
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }
    }

    impl From<DVec2> for Point2 {
        fn from(value: DVec2) -> Self {
            Self::from_vec(value)
        }
    }

    /// 三维点（世界坐标），拾取得到的点一律以此类型传递。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Point3(pub DVec3);

    impl Point3 {
        pub const ORIGIN: Point3 = Point3(DVec3::ZERO);

        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn x(self) -> f64 {
            self.0.x
        }

        #[inline]
        pub fn y(self) -> f64 {
            self.0.y
        }

        #[inline]
        pub fn z(self) -> f64 {
            self.0.z
        }

        #[inline]
        pub fn translate(self, offset: Vector3) -> Self {
            Self(self.0 + offset.0)
        }

        #[inline]
        pub fn vector_to(self, other: Point3) -> Vector3 {
            Vector3(other.0 - self.0)
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        /// 逐分量比较，容差为绝对值。
        pub fn approx_eq(self, other: Point3, tolerance: f64) -> bool {
            (self.0 - other.0).abs().max_element() <= tolerance
        }
    }

    impl From<DVec3> for Point3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Vector3(pub DVec3);

    impl Vector3 {
        pub const X: Vector3 = Vector3(DVec3::X);
        pub const Y: Vector3 = Vector3(DVec3::Y);
        pub const Z: Vector3 = Vector3(DVec3::Z);

        #[inline]
        pub fn new(x: f64, y: f64, z: f64) -> Self {
            Self(DVec3::new(x, y, z))
        }

        #[inline]
        pub fn as_vec3(self) -> DVec3 {
            self.0
        }

        #[inline]
        pub fn length_squared(self) -> f64 {
            self.0.length_squared()
        }

        #[inline]
        pub fn normalize(self) -> Option<Self> {
            let len = self.0.length();
            if len <= f64::EPSILON {
                None
            } else {
                Some(Self(self.0 / len))
            }
        }

        #[inline]
        pub fn dot(self, other: Vector3) -> f64 {
            self.0.dot(other.0)
        }

        #[inline]
        pub fn cross(self, other: Vector3) -> Vector3 {
            Self(self.0.cross(other.0))
        }

        #[inline]
        pub fn scale(self, factor: f64) -> Vector3 {
            Self(self.0 * factor)
        }
    }

    impl From<DVec3> for Vector3 {
        fn from(value: DVec3) -> Self {
            Self(value)
        }
    }

    /// 工作坐标系（UCS）：原点、平面内两条单位轴以及法向。
    ///
    /// 二维拾取投影到 `x_axis`/`y_axis` 张成的平面上，`normal` 方向的分量即点的标高。
    /// 三条轴保持正交归一，`to_local` 与 `to_world` 互为逆变换。
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Frame {
        origin: Point3,
        x_axis: Vector3,
        y_axis: Vector3,
        normal: Vector3,
    }

    impl Frame {
        /// 世界坐标系。
        pub fn world() -> Self {
            Self {
                origin: Point3::ORIGIN,
                x_axis: Vector3::X,
                y_axis: Vector3::Y,
                normal: Vector3::Z,
            }
        }

        /// 由原点与两条平面轴构造坐标系。`y_axis` 会按 `x_axis` 正交化；
        /// 若两轴退化（零长或共线）则返回 `None`。
        pub fn new(origin: Point3, x_axis: Vector3, y_axis: Vector3) -> Option<Self> {
            let x_axis = x_axis.normalize()?;
            let projected = y_axis.as_vec3() - x_axis.as_vec3() * y_axis.dot(x_axis);
            let y_axis = Vector3(projected).normalize()?;
            let normal = x_axis.cross(y_axis).normalize()?;
            Some(Self {
                origin,
                x_axis,
                y_axis,
                normal,
            })
        }

        #[inline]
        pub fn origin(&self) -> Point3 {
            self.origin
        }

        #[inline]
        pub fn x_axis(&self) -> Vector3 {
            self.x_axis
        }

        #[inline]
        pub fn y_axis(&self) -> Vector3 {
            self.y_axis
        }

        #[inline]
        pub fn normal(&self) -> Vector3 {
            self.normal
        }

        /// 世界点转换到本坐标系，返回值的 z 分量为平面外距离。
        pub fn to_local(&self, point: Point3) -> Point3 {
            let offset = self.origin.vector_to(point);
            Point3::new(
                offset.dot(self.x_axis),
                offset.dot(self.y_axis),
                offset.dot(self.normal),
            )
        }

        pub fn to_world(&self, local: Point3) -> Point3 {
            let offset = self.x_axis.as_vec3() * local.x()
                + self.y_axis.as_vec3() * local.y()
                + self.normal.as_vec3() * local.z();
            self.origin.translate(Vector3(offset))
        }

        /// 本坐标系下的方向向量转换为世界方向。
        pub fn direction_to_world(&self, local: Vector3) -> Vector3 {
            let v = local.as_vec3();
            Vector3(
                self.x_axis.as_vec3() * v.x + self.y_axis.as_vec3() * v.y + self.normal.as_vec3() * v.z,
            )
        }

        /// 点在工作平面上的二维投影。
        #[inline]
        pub fn project(&self, point: Point3) -> Point2 {
            let local = self.to_local(point);
            Point2::new(local.x(), local.y())
        }

        /// 点相对工作平面的标高。
        #[inline]
        pub fn elevation_of(&self, point: Point3) -> f64 {
            self.to_local(point).z()
        }

        /// 前乘平移：原点沿世界向量 `offset` 平移，轴方向保持不变。
        #[inline]
        pub fn displaced(&self, offset: Vector3) -> Self {
            Self {
                origin: self.origin.translate(offset),
                ..*self
            }
        }
    }

    impl Default for Frame {
        fn default() -> Self {
            Self::world()
        }
    }

}

pub mod document {
    use std::collections::HashMap;

    use serde::{Deserialize, Serialize};

    use crate::geometry::{Point2, Point3, Vector3};

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct EntityId(u64);

    impl EntityId {
        #[inline]
        pub fn new(raw: u64) -> Self {
            Self(raw)
        }

        /// 提供原始数值，便于日志输出。
        #[inline]
        pub fn get(self) -> u64 {
            self.0
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct Layer {
        pub name: String,
        pub is_visible: bool,
    }

    impl Layer {
        #[inline]
        pub fn new(name: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                is_visible: true,
            }
        }
    }

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub enum Entity {
        Line(Line),
        Polyline(Polyline),
    }

    impl Entity {
        #[inline]
        pub fn layer_name(&self) -> &str {
            match self {
                Entity::Line(line) => &line.layer,
                Entity::Polyline(polyline) => &polyline.layer,
            }
        }

        /// 实体类型名，用于日志与错误信息。
        #[inline]
        pub fn kind(&self) -> &'static str {
            match self {
                Entity::Line(_) => "LINE",
                Entity::Polyline(_) => "POLYLINE",
            }
        }
    }

    /// 世界坐标下的独立线段。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Line {
        pub start: Point3,
        pub end: Point3,
        pub layer: String,
    }

    impl Line {
        pub fn length(&self) -> f64 {
            self.start.vector_to(self.end).length_squared().sqrt()
        }
    }

    /// 平面多段线。顶点为工作平面内的二维坐标，`elevation` 为平面沿 `normal` 的标高。
    /// 闭合多段线的末顶点与首顶点重合，同时 `is_closed` 为真。
    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    pub struct Polyline {
        pub vertices: Vec<PolylineVertex>,
        pub elevation: f64,
        pub normal: Vector3,
        pub is_closed: bool,
        pub layer: String,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct PolylineVertex {
        pub position: Point2,
    }

    impl PolylineVertex {
        #[inline]
        pub fn new(position: Point2) -> Self {
            Self { position }
        }
    }

    #[derive(Debug, Default, Clone, Serialize, Deserialize)]
    pub struct Document {
        layers: HashMap<String, Layer>,
        entities: Vec<(EntityId, Entity)>,
        next_entity_id: u64,
    }

    impl Document {
        pub fn new() -> Self {
            let mut doc = Self::default();
            doc.ensure_layer("0");
            doc
        }

        pub fn ensure_layer(&mut self, name: impl AsRef<str>) {
            let key = name.as_ref();
            self.layers
                .entry(key.to_string())
                .or_insert_with(|| Layer::new(key));
        }

        pub fn add_line(
            &mut self,
            start: Point3,
            end: Point3,
            layer: impl Into<String>,
        ) -> EntityId {
            let layer = layer.into();
            self.ensure_layer(&layer);
            let id = self.next_id();
            self.entities
                .push((id, Entity::Line(Line { start, end, layer })));
            id
        }

        pub fn add_polyline<I>(
            &mut self,
            vertices: I,
            elevation: f64,
            normal: Vector3,
            is_closed: bool,
            layer: impl Into<String>,
        ) -> EntityId
        where
            I: IntoIterator<Item = Point2>,
        {
            let layer = layer.into();
            self.ensure_layer(&layer);
            let vertices = vertices.into_iter().map(PolylineVertex::new).collect();
            let id = self.next_id();
            self.entities.push((
                id,
                Entity::Polyline(Polyline {
                    vertices,
                    elevation,
                    normal,
                    is_closed,
                    layer,
                }),
            ));
            id
        }

        pub fn add_entity(&mut self, entity: Entity) -> EntityId {
            self.ensure_layer(entity.layer_name());
            let id = self.next_id();
            self.entities.push((id, entity));
            id
        }

        /// 删除实体并返回其内容；实体不存在时返回 `None`。
        pub fn remove_entity(&mut self, id: EntityId) -> Option<Entity> {
            let index = self
                .entities
                .iter()
                .position(|(entity_id, _)| *entity_id == id)?;
            Some(self.entities.remove(index).1)
        }

        #[inline]
        pub fn layers(&self) -> impl Iterator<Item = &Layer> {
            self.layers.values()
        }

        #[inline]
        pub fn entities(&self) -> impl Iterator<Item = &(EntityId, Entity)> {
            self.entities.iter()
        }

        #[inline]
        pub fn entity_count(&self) -> usize {
            self.entities.len()
        }

        #[inline]
        pub fn entity(&self, id: EntityId) -> Option<&Entity> {
            self.entities
                .iter()
                .find_map(|(entity_id, entity)| (*entity_id == id).then_some(entity))
        }

        #[inline]
        pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
            self.entities
                .iter_mut()
                .find_map(|(entity_id, entity)| (*entity_id == id).then_some(entity))
        }

        fn next_id(&mut self) -> EntityId {
            let id = EntityId::new(self.next_entity_id);
            self.next_entity_id += 1;
            id
        }
    }

}
