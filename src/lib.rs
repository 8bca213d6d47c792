pub mod background;
pub mod capture;
pub mod convert;
pub mod features;
pub mod flow;
pub mod pipeline;
pub mod prelude;
pub mod sink;

#[cfg(test)]
pub(crate) mod testing;
