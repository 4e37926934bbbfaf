use std::path::Path;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use reflector_engine::parser::{tokenize, Tokenizer};
use reflector_engine::preparser::preparse;
use reflector_engine::RunConfig;

fn class_header(properties: usize) -> String {
    let mut text = String::from(
        "#pragma once\n#include \"CoreMinimal.h\"\n#include \"Thing.generated.h\"\n\n\
         /** A thing with many properties */\nUCLASS(Blueprintable, meta=(DisplayName=\"Thing\"))\n\
         class GAME_API UThing : public UObject\n{\n    GENERATED_BODY()\npublic:\n",
    );
    for i in 0..properties {
        text.push_str(&format!(
            "    // Property {i}\n    UPROPERTY(EditAnywhere, Category=\"Stats\", meta=(ClampMin=\"0.0\"))\n    float Value{i} = {i}.5f;\n\n"
        ));
    }
    text.push_str("};\n");
    text
}

fn bench_specifiers(c: &mut Criterion) {
    let source = "UPROPERTY(EditAnywhere, BlueprintReadWrite, Category=\"Stats\", meta=(ClampMin=\"0\", UIMin=\"0\"))";

    c.bench_function("lex_specifiers", |b| {
        b.iter(|| tokenize(black_box(source)).unwrap());
    });
}

fn bench_streaming(c: &mut Criterion) {
    let source = class_header(50);

    c.bench_function("lex_streaming", |b| {
        b.iter(|| {
            let mut lexer = Tokenizer::new(black_box(&source));
            let mut count = 0usize;
            while let Some(_token) = lexer.next_token().unwrap() {
                count += 1;
            }
            count
        });
    });
}

fn bench_headers(c: &mut Criterion) {
    let mut group = c.benchmark_group("headers");

    for properties in [10, 100, 1000] {
        let source = class_header(properties);
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("tokenize", properties), &source, |b, source| {
            b.iter(|| tokenize(black_box(source)).unwrap());
        });
    }

    group.finish();
}

fn bench_preparse(c: &mut Criterion) {
    let mut group = c.benchmark_group("preparse");
    let config = RunConfig::default();

    for properties in [10, 100, 1000] {
        let mut source = class_header(properties);
        source.insert_str(0, "#if WITH_EDITOR\nvoid EditorOnly();\n#endif\n#if CPP\nint NativeOnly;\n#else\nint ScriptOnly;\n#endif\n");
        group.throughput(Throughput::Bytes(source.len() as u64));
        group.bench_with_input(BenchmarkId::new("preparse", properties), &source, |b, source| {
            b.iter(|| preparse(Path::new("Thing.h"), black_box(source), &config).unwrap());
        });
    }

    group.finish();
}

criterion_group!(benches, bench_specifiers, bench_streaming, bench_headers, bench_preparse);
criterion_main!(benches);
