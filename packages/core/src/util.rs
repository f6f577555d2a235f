#[macro_export]
macro_rules! hex_literal {
    ($hex:expr) => {
        hex::decode($hex).unwrap()
    };
}
