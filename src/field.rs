
use log::trace;

use crate::params::{FieldOrder, InterlacingParam, InterlacingType};

/// Interlacing related properties attached to a source frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameProps {
    /// `_FieldBased`: 0 progressive, 1 bottom field first, 2 top field first.
    pub field_based: Option<i64>,
    /// `_Field`: 0 bottom, 1 top.
    pub field: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldInfo {
    pub interlaced: bool,
    pub top: bool,
}

impl FieldInfo {
    pub const PROGRESSIVE: Self = Self {
        interlaced: false,
        top: true,
    };

    #[must_use]
    pub const fn interlacing_type(self) -> InterlacingType {
        InterlacingType::from_flags(self.interlaced, self.top)
    }
}

/// Decides whether frame `n` is a field, and which one.
///
/// Explicit field order wins over the frame properties. When the order is
/// automatic and cannot be deduced, the frame is handled as progressive.
#[must_use]
pub fn resolve_interlacing(
    n: usize,
    props: Option<&FrameProps>,
    interlaced: InterlacingParam,
    order: FieldOrder,
) -> FieldInfo {
    let mut info = FieldInfo {
        interlaced: interlaced == InterlacingParam::Fields,
        top: true,
    };

    if interlaced == InterlacingParam::Frames {
        return info;
    }

    let field_based = props.and_then(|p| p.field_based);
    if let Some(fb) = field_based {
        info.interlaced |= fb != 0;
    }

    match (order, props) {
        (FieldOrder::Bff, _) => info.top = n & 1 != 0,
        (FieldOrder::Tff, _) => info.top = n & 1 == 0,
        (FieldOrder::Auto, None) => info.interlaced = false,
        (FieldOrder::Auto, Some(props)) if info.interlaced => {
            if let Some(field) = props.field {
                info.top = field != 0;
            } else if let Some(fb @ (1 | 2)) = field_based {
                info.top = (n & 1) as i64 == fb - 1;
            } else {
                info.interlaced = false;
            }
        }
        (FieldOrder::Auto, Some(_)) => (),
    }

    trace!(
        "frame {}: {:?} ({:?}, {:?})",
        n,
        info.interlacing_type(),
        interlaced,
        order
    );
    info
}
