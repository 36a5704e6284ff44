fn main() {
    // ESP-IDF link args are only needed for the device build; host tests
    // compile without the toolchain.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
