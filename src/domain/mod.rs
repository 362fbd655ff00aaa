// Domain layer - sources, normalized series, slicing and chart specifications
pub mod chart;
pub mod series;
pub mod slice;
pub mod source;
