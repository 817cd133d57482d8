
use std::hash::{DefaultHasher, Hash, Hasher};

use crate::{
    params::{Dir, FieldPair},
    weights::AxisGeometry,
};

/// Everything that defines the resampling of one plane for one combination
/// of destination and source field types.
///
/// Equality and hashing compare the bit patterns of the real fields, so two
/// specs are the same key only when they are bit-identical.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResampleSpecPlane {
    pub src_width: usize,
    pub src_height: usize,
    pub dst_width: usize,
    pub dst_height: usize,
    pub win_x: f64,
    pub win_y: f64,
    pub win_w: f64,
    pub win_h: f64,
    pub center_pos_src_h: f64,
    pub center_pos_src_v: f64,
    pub center_pos_dst_h: f64,
    pub center_pos_dst_v: f64,
    pub kernel_scale_h: f64,
    pub kernel_scale_v: f64,
    pub kernel_hash_h: u64,
    pub kernel_hash_v: u64,
    pub gain: f64,
    pub add_cst: f64,
}

impl ResampleSpecPlane {
    fn bits(&self) -> ([usize; 4], [u64; 14]) {
        (
            [
                self.src_width,
                self.src_height,
                self.dst_width,
                self.dst_height,
            ],
            [
                self.win_x.to_bits(),
                self.win_y.to_bits(),
                self.win_w.to_bits(),
                self.win_h.to_bits(),
                self.center_pos_src_h.to_bits(),
                self.center_pos_src_v.to_bits(),
                self.center_pos_dst_h.to_bits(),
                self.center_pos_dst_v.to_bits(),
                self.kernel_scale_h.to_bits(),
                self.kernel_scale_v.to_bits(),
                self.kernel_hash_h,
                self.kernel_hash_v,
                self.gain.to_bits(),
                self.add_cst.to_bits(),
            ],
        )
    }

    /// Mapping of the destination axis `dir` onto the source.
    #[must_use]
    pub const fn axis(&self, dir: Dir) -> AxisGeometry {
        match dir {
            Dir::H => AxisGeometry {
                src_len: self.src_width,
                dst_len: self.dst_width,
                win_pos: self.win_x,
                win_len: self.win_w,
                center_src: self.center_pos_src_h,
                center_dst: self.center_pos_dst_h,
                kernel_scale: self.kernel_scale_h,
            },
            Dir::V => AxisGeometry {
                src_len: self.src_height,
                dst_len: self.dst_height,
                win_pos: self.win_y,
                win_len: self.win_h,
                center_src: self.center_pos_src_v,
                center_dst: self.center_pos_dst_v,
                kernel_scale: self.kernel_scale_v,
            },
        }
    }
}

impl PartialEq for ResampleSpecPlane {
    fn eq(&self, other: &Self) -> bool {
        self.bits() == other.bits()
    }
}

impl Eq for ResampleSpecPlane {}

impl Hash for ResampleSpecPlane {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bits().hash(state);
    }
}

/// Deterministic structural key of a spec.
#[must_use]
pub fn spec_key(spec: &ResampleSpecPlane) -> u64 {
    let mut hasher = DefaultHasher::new();
    spec.hash(&mut hasher);
    hasher.finish()
}

/// The nine specs of one plane, one per [`FieldPair`].
#[derive(Debug, Clone, Default)]
pub struct SpecTable {
    specs: [ResampleSpecPlane; FieldPair::COUNT],
}

impl SpecTable {
    /// Fills the table from `make`, called once per pair.
    pub fn from_fn(mut make: impl FnMut(FieldPair) -> ResampleSpecPlane) -> Self {
        let mut table = Self::default();
        for pair in FieldPair::all() {
            table.specs[pair.index()] = make(pair);
        }
        table
    }

    #[must_use]
    pub const fn get(&self, pair: FieldPair) -> &ResampleSpecPlane {
        &self.specs[pair.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (FieldPair, &ResampleSpecPlane)> {
        FieldPair::all().map(|pair| (pair, self.get(pair)))
    }
}
