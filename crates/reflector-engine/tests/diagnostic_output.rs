//! Rendering compile failures as diagnostics

use std::path::PathBuf;

use reflector_engine::diagnostic::{create_files, JsonDiagnostic};
use reflector_engine::{compile_module, Diagnostic, ModuleDescriptor, RunContext};
use termcolor::Buffer;

const SOURCE: &str = "UCLASS()\nclass UThing\n{\n GENERATED_BODY()\npublic:\n UPROPERTY()\n FMissing Target;\n};\n";

fn failing_compile() -> reflector_engine::Error {
    let mut ctx = RunContext::default();
    compile_module(
        &mut ctx,
        &ModuleDescriptor::new("Game"),
        &[(PathBuf::from("Thing.h"), SOURCE.to_string())],
    )
    .unwrap_err()
}

#[test]
fn test_unresolved_type_rendered_at_line() {
    let error = failing_compile();
    let files = create_files(&error.file, SOURCE);
    let diag = Diagnostic::from_error(&error, 0, &files);

    let mut buffer = Buffer::no_color();
    diag.emit_to(&mut buffer, &files).unwrap();
    let rendered = String::from_utf8(buffer.into_inner()).unwrap();

    assert!(rendered.starts_with("error[R3001]: Unrecognized type 'FMissing'"), "{}", rendered);
    assert!(rendered.contains("Thing.h:7:1"), "{}", rendered);
    assert!(rendered.contains("FMissing Target;"), "{}", rendered);
}

#[test]
fn test_unresolved_type_as_json() {
    let error = failing_compile();
    let files = create_files(&error.file, SOURCE);
    let json = Diagnostic::from_error(&error, 0, &files).to_json(&files).unwrap();

    let parsed: JsonDiagnostic = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.severity, "error");
    assert_eq!(parsed.labels[0].start_line, 7);
    assert_eq!(parsed.notes, ["semantic error"]);
}
