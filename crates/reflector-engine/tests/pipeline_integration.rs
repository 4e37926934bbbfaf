//! Integration tests for whole-module compilation
//!
//! Runs header batches through preparse, ordering, declaration parsing, type
//! resolution and code generation using only the public API.

use std::path::PathBuf;

use reflector_engine::registry::{Category, TypeShape};
use reflector_engine::{compile_module, ErrorKind, ModuleDescriptor, RunConfig, RunContext, UnitKind};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn files(list: &[(&str, &str)]) -> Vec<(PathBuf, String)> {
    list.iter()
        .map(|(path, text)| (PathBuf::from(path), text.to_string()))
        .collect()
}

fn shapes_config() -> RunConfig {
    RunConfig::from_toml_str(
        r#"
        [naming]
        class_prefix = "C"
        struct_prefix = "S"
        prefix_overrides = []
        "#,
    )
    .expect("valid config")
}

const SHAPE_HEADER: &str = r#"#pragma once
#include "Shape.generated.h"

USTRUCT()
struct SPoint
{
    GENERATED_BODY()

    UPROPERTY()
    float X;

    UPROPERTY()
    float Y;
};

UCLASS()
class CShape
{
    GENERATED_BODY()
public:
    UPROPERTY()
    SPoint Location;

    UFUNCTION()
    float Area() const;
};
"#;

const CIRCLE_HEADER: &str = r#"#pragma once
#include "Circle.generated.h"

UCLASS()
class CCircle : public CShape
{
    GENERATED_BODY()
public:
    UPROPERTY()
    float Radius;
};
"#;

// ============================================================================
// Shapes scenario
// ============================================================================

#[test]
fn test_shapes_ordered_by_base_class() {
    init_logging();
    let mut ctx = RunContext::new(shapes_config());
    compile_module(
        &mut ctx,
        &ModuleDescriptor::new("Shapes"),
        &files(&[("Circle.h", CIRCLE_HEADER), ("Shape.h", SHAPE_HEADER)]),
    )
    .unwrap();

    let order: Vec<_> = ctx.processed.iter().map(|&id| ctx.unit(id).file_name()).collect();
    assert_eq!(order, ["Shape.h", "Circle.h"]);
}

#[test]
fn test_shapes_inherited_property_resolves_to_struct() {
    init_logging();
    let mut ctx = RunContext::new(shapes_config());
    compile_module(
        &mut ctx,
        &ModuleDescriptor::new("Shapes"),
        &files(&[("Shape.h", SHAPE_HEADER), ("Circle.h", CIRCLE_HEADER)]),
    )
    .unwrap();

    let registry = &ctx.registry;
    let circle = registry.find(Category::Class, "CCircle").unwrap();
    let shape = registry.find(Category::Class, "CShape").unwrap();
    let point = registry.find(Category::Struct, "SPoint").unwrap();
    assert_eq!(registry.get(circle).super_entity, Some(shape));

    let (owner, location) = registry.find_inherited_property(circle, "Location").unwrap();
    assert_eq!(owner, shape);
    assert_eq!(location.shape, TypeShape::StructRef(point));

    let own: Vec<_> = registry.get(circle).properties.iter().map(|p| p.name.as_str()).collect();
    assert_eq!(own, ["Radius"]);
    assert_eq!(registry.get(shape).functions[0].name, "Area");
}

#[test]
fn test_shapes_circle_accessor_links_super() {
    init_logging();
    let mut ctx = RunContext::new(shapes_config());
    let output = compile_module(
        &mut ctx,
        &ModuleDescriptor::new("Shapes"),
        &files(&[("Shape.h", SHAPE_HEADER), ("Circle.h", CIRCLE_HEADER)]),
    )
    .unwrap();

    let circle = output.unit(UnitKind::Class, "CCircle").unwrap();
    assert_eq!(circle.singleton_name, "Z_Construct_UClass_CCircle()");
    assert!(circle.text.contains("Z_Construct_UClass_CShape();"));
    assert!(circle.text.contains("NewProp_Radius"));
    assert!(!circle.text.contains("NewProp_Location"));

    let point = output.unit(UnitKind::Struct, "SPoint").unwrap();
    assert!(point.text.contains("TEXT(\"Point\")"));
    assert!(output.unit(UnitKind::Function, "Area").is_some());
    assert_eq!(output.package.kind, UnitKind::Package);
}

// ============================================================================
// Failure scenarios
// ============================================================================

#[test]
fn test_mutual_include_names_both_files() {
    init_logging();
    let mut ctx = RunContext::default();
    let err = compile_module(
        &mut ctx,
        &ModuleDescriptor::new("Game"),
        &files(&[
            ("A.h", "#pragma once\n#include \"B.h\"\n"),
            ("B.h", "#pragma once\n#include \"A.h\"\n"),
        ]),
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Dependency);
    assert!(err.message.contains("A.h"), "{}", err.message);
    assert!(err.message.contains("B.h"), "{}", err.message);
    assert!(ctx.processed.is_empty());
}

#[test]
fn test_unresolved_type_reported_once() {
    init_logging();
    let mut ctx = RunContext::default();
    let err = compile_module(
        &mut ctx,
        &ModuleDescriptor::new("Game"),
        &files(&[(
            "Thing.h",
            "UCLASS()\nclass UThing\n{\n GENERATED_BODY()\npublic:\n UPROPERTY()\n FMissing Target;\n};\n",
        )]),
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Semantic);
    assert_eq!(err.file, PathBuf::from("Thing.h"));
    assert_eq!(err.line, 7);

    let thing = ctx.registry.find(Category::Class, "UThing").unwrap();
    assert!(ctx.registry.get(thing).properties.is_empty());
    assert!(!ctx.registry.get(thing).complete);
}

#[test]
fn test_conflicting_visibility_specifiers() {
    init_logging();
    let mut ctx = RunContext::default();
    let err = compile_module(
        &mut ctx,
        &ModuleDescriptor::new("Game"),
        &files(&[(
            "Thing.h",
            "UCLASS()\nclass UThing\n{\n GENERATED_BODY()\npublic:\n UPROPERTY(EditAnywhere, VisibleAnywhere)\n int32 Health;\n};\n",
        )]),
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Semantic);
    assert!(err.message.contains("more than one edit/visibility specifier"));
    assert_eq!(err.file, PathBuf::from("Thing.h"));
}

#[test]
fn test_header_without_annotations() {
    let mut ctx = RunContext::default();
    let output = compile_module(
        &mut ctx,
        &ModuleDescriptor::new("Game"),
        &files(&[("Plain.h", "#pragma once\nstruct FPlain { int x; };\nclass Foo { void f() {} };\n")]),
    )
    .unwrap();

    assert!(ctx.registry.is_empty());
    assert!(output.units.is_empty());
    assert!(output.headers.is_empty());
    assert!(output.package.text.contains("/Script/Game"));
}

#[test]
fn test_failing_dependency_reported_in_its_own_file() {
    init_logging();
    let mut ctx = RunContext::default();
    let err = compile_module(
        &mut ctx,
        &ModuleDescriptor::new("Game"),
        &files(&[
            (
                "Derived.h",
                "#pragma once
#include \"Base.h\"
UCLASS()
class UDerived : public UBase
{
 GENERATED_BODY()
};
",
            ),
            (
                "Base.h",
                "#pragma once
UCLASS()
class UBase
{
 GENERATED_BODY()
public:
 UPROPERTY()
 FMissing Target;
};
",
            ),
        ]),
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Semantic);
    assert_eq!(err.file, PathBuf::from("Base.h"));
    assert_eq!(err.line, 8);
    assert!(ctx.processed.is_empty());
}

#[test]
fn test_inheritance_cycle_names_both_files() {
    init_logging();
    let mut ctx = RunContext::default();
    let err = compile_module(
        &mut ctx,
        &ModuleDescriptor::new("Game"),
        &files(&[
            ("A.h", "UCLASS()
class UA : public UB
{
 GENERATED_BODY()
};
"),
            ("B.h", "UCLASS()
class UB : public UA
{
 GENERATED_BODY()
};
"),
        ]),
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Dependency);
    assert!(err.message.contains("A.h"), "{}", err.message);
    assert!(err.message.contains("B.h"), "{}", err.message);
    assert!(ctx.processed.is_empty());
}

#[test]
fn test_class_inheriting_from_itself() {
    init_logging();
    let mut ctx = RunContext::default();
    let err = compile_module(
        &mut ctx,
        &ModuleDescriptor::new("Game"),
        &files(&[("Self.h", "UCLASS()
class USelf : public USelf
{
 GENERATED_BODY()
};
")]),
    )
    .unwrap_err();

    assert_eq!(err.kind, ErrorKind::Dependency);
    assert_eq!(err.message, "Class 'USelf' cannot inherit from itself");
    assert_eq!(err.file, PathBuf::from("Self.h"));
    assert_eq!(err.line, 2);
}
