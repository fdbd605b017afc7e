pub mod order_service;
pub mod recovery;

#[cfg(test)]
pub(crate) mod test_support;
