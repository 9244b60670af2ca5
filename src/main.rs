fn main() -> std::process::ExitCode {
    document_classifier_lib::run()
}
