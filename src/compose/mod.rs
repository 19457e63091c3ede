pub(crate) mod cached;
pub(crate) mod compositor;
pub(crate) mod full;
pub(crate) mod parallel;
pub(crate) mod region;
