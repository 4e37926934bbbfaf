//! Pre-parser and tokenizer behavior over realistic headers

use std::path::Path;

use reflector_engine::module::DependencyKind;
use reflector_engine::parser::{tokenize, TokenKind};
use reflector_engine::preparser::preparse;
use reflector_engine::{ErrorKind, RunConfig};

const PAWN_HEADER: &str = r#"// Pawn header
#pragma once

#include "CoreMinimal.h"
#include "Engine/Thing.h"
#if CPP
#include "NativeOnly.h"
#endif
#include "Pawn.generated.h"

/* A multi-line
   comment */
UCLASS(Blueprintable)
class GAME_API UPawn : public UThing, public IDamageable
{
    GENERATED_BODY()
};
"#;

#[test]
fn test_dependencies_and_skeleton() {
    let file = preparse(Path::new("Pawn.h"), PAWN_HEADER, &RunConfig::default()).unwrap();

    let names: Vec<_> = file.dependencies.iter().map(|d| d.kind.name().to_string()).collect();
    assert_eq!(names, ["CoreMinimal.h", "Thing.h", "UThing", "UDamageable"]);
    assert!(matches!(file.dependencies[2].kind, DependencyKind::Base(_)));

    let skeleton = &file.skeletons[0];
    assert_eq!(skeleton.name, "UPawn");
    assert_eq!(skeleton.api.as_deref(), Some("GAME_API"));
    assert_eq!(skeleton.raw_super.as_deref(), Some("UThing"));
    assert_eq!(skeleton.line, 14);
    assert_eq!(file.text.lines().count(), PAWN_HEADER.lines().count());
}

#[test]
fn test_include_after_generated_header() {
    let err = preparse(
        Path::new("Late.h"),
        "#include \"Late.generated.h\"\n#include \"Other.h\"\n",
        &RunConfig::default(),
    )
    .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Semantic);
    assert_eq!(err.line, 2);
    assert_eq!(err.file, Path::new("Late.h"));
}

#[test]
fn test_tokens_keep_lines_across_comments() {
    let tokens = tokenize("/* one\ntwo */ UPROPERTY(EditAnywhere)\nfloat Radius = 1.5f;").unwrap();
    assert_eq!(tokens[0].text, "UPROPERTY");
    assert_eq!(tokens[0].line(), 2);
    let radius = tokens.iter().find(|t| t.text == "Radius").unwrap();
    assert_eq!(radius.line(), 3);
    assert!(tokens.iter().any(|t| t.kind == TokenKind::FloatConst));
}

#[test]
fn test_unterminated_string_is_lex_error() {
    let err = preparse(Path::new("Bad.h"), "#include \"Open.h\n", &RunConfig::default()).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Lex);
    assert_eq!(err.file, Path::new("Bad.h"));
}
