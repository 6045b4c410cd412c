pub(crate) mod runtimes;
