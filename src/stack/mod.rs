pub(crate) mod layer;
#[allow(clippy::module_inception)]
pub(crate) mod stack;
