pub mod comparator;
pub mod graph;
pub mod group_computer;
pub mod miniature;
pub mod pixel_group;
