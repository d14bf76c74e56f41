pub mod space;

pub mod copyspace;
pub mod immortalspace;
pub mod largeobjectspace;
pub mod markcompactspace;
pub mod marksweepspace;
