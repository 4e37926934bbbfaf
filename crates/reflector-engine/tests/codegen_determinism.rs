//! Determinism of generated units and their content hashes

use std::path::PathBuf;

use reflector_engine::codegen::UnitHash;
use reflector_engine::{compile_module, ModuleDescriptor, ModuleOutput, RunContext, UnitKind};

fn generate(text: &str) -> ModuleOutput {
    let mut ctx = RunContext::default();
    compile_module(
        &mut ctx,
        &ModuleDescriptor::new("Game"),
        &[(PathBuf::from("Thing.h"), text.to_string())],
    )
    .expect("module compiles")
}

fn meta(pairs: &str) -> String {
    if pairs.is_empty() {
        String::new()
    } else {
        format!("meta=({})", pairs)
    }
}

fn thing(class_meta: &str, property_meta: &str) -> String {
    format!(
        "#include \"Thing.generated.h\"\n\
         UENUM()\nenum class EState : uint8\n{{\n Idle,\n Busy\n}};\n\
         UCLASS({})\nclass UThing\n{{\n GENERATED_BODY()\npublic:\n\
         UPROPERTY(EditAnywhere, Category=Stats, {})\n int32 Health;\n\
         UPROPERTY()\n EState State;\n\
         UFUNCTION(BlueprintCallable, Category=Stats)\n void Heal(int32 Amount);\n}};\n",
        meta(class_meta),
        meta(property_meta)
    )
}

#[test]
fn test_identical_input_identical_hashes() {
    let source = thing("DisplayName=\"Thing\"", "ClampMin=\"0\"");
    let first = generate(&source);
    let second = generate(&source);

    assert_eq!(first.units.len(), second.units.len());
    for (a, b) in first.units.iter().zip(&second.units) {
        assert_eq!(a.singleton_name, b.singleton_name);
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash, UnitHash::of(&a.text));
    }
    assert_eq!(first.package.hash, second.package.hash);
    assert_eq!(first.text(), second.text());

    let header = first.header("Thing.generated.h").expect("generated header");
    assert_eq!(header.hash, second.header("Thing.generated.h").unwrap().hash);
    assert_eq!(header.hash, UnitHash::of(&header.text));
}

#[test]
fn test_every_parameter_struct_is_defined() {
    let output = generate(
        "DECLARE_DYNAMIC_DELEGATE_RetVal_OneParam(bool, FOnCheck, int32, Value);
         UCLASS()
class UThing
{
 GENERATED_BODY()
public:
         UFUNCTION(BlueprintCallable, Category=Stats)
 void Heal(int32 Amount);
         UFUNCTION(BlueprintImplementableEvent)
 float Score(const FString& Reason) const;
         UFUNCTION(BlueprintNativeEvent)
 void Ping();
         UPROPERTY()
 FOnCheck OnCheck;
};
",
    );
    let mut all = output.text();
    for header in &output.headers {
        all.push_str(&header.text);
    }

    let mut checked = 0;
    for (at, _) in all.match_indices("sizeof(") {
        let rest = &all[at + "sizeof(".len()..];
        let name = &rest[..rest.find(')').unwrap()];
        if name.ends_with("_Parms") {
            assert!(all.contains(&format!("struct {}\n", name)), "{} is never defined", name);
            checked += 1;
        }
    }
    assert_eq!(checked, 3);
}

#[test]
fn test_metadata_insertion_order_does_not_change_hash() {
    let one = generate(&thing(
        "DisplayName=\"Thing\", ShortTooltip=\"A thing\"",
        "ClampMin=\"0\", ClampMax=\"100\"",
    ));
    let two = generate(&thing(
        "ShortTooltip=\"A thing\", DisplayName=\"Thing\"",
        "ClampMax=\"100\", ClampMin=\"0\"",
    ));

    let class_one = one.unit(UnitKind::Class, "UThing").unwrap();
    let class_two = two.unit(UnitKind::Class, "UThing").unwrap();
    assert_eq!(class_one.text, class_two.text);
    assert_eq!(class_one.hash, class_two.hash);
}

#[test]
fn test_changed_property_changes_hash() {
    let one = generate(&thing("", "ClampMin=\"0\""));
    let two = generate(&thing("", "ClampMin=\"1\""));
    assert_ne!(
        one.unit(UnitKind::Class, "UThing").unwrap().hash,
        two.unit(UnitKind::Class, "UThing").unwrap().hash
    );
    assert_eq!(
        one.unit(UnitKind::Enum, "EState").unwrap().hash,
        two.unit(UnitKind::Enum, "EState").unwrap().hash
    );
}
