#[cfg(test)]
mod load_test;
#[cfg(test)]
mod system_tests;
