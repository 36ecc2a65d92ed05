fn main() {
    // embuild is only pulled in with the `espidf` feature; host builds
    // (tests, --no-default-features) have nothing to generate.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
