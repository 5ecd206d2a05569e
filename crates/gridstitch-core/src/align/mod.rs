pub mod overlap;
pub mod phase_correlation;

pub use overlap::{
    estimate_shifts, horizontal_shift, nominal_overlap, vertical_shift, AxisEstimate,
    Degradation, OverlapEstimate, ReferenceAnchors, ShiftSource,
};
pub use phase_correlation::{phase_cross_correlation, RegistrationOffset};
