//! Benchmarks for type rendering.
//!
//! Renders a synthetic class with many small methods in both views, and parses a documentation
//! file of matching size:
//! - Interface view (declarations only)
//! - Full view (lifted bodies)
//! - XML documentation parsing

extern crate nuscope;

use criterion::{criterion_group, criterion_main, Criterion};
use nuscope::{
    decompiler::{CodeView, Decompiler, DecompilerSettings},
    metadata::{
        FullTypeName, Instruction, MethodBody, MethodDefinition, ModuleDefinition, Operand,
        ParameterDefinition, PrimitiveType, TypeDefinition, TypeSig, Visibility, XmlDocumentation,
    },
    reader::NullResolver,
};
use std::{hint::black_box, sync::Arc};

const METHODS: usize = 200;

/// `public class Calculator` with `int OpN(int a, int b) { return a * b + N; }` methods.
fn calculator() -> Arc<ModuleDefinition> {
    let int = TypeSig::Primitive(PrimitiveType::Int32);
    let mut ty = TypeDefinition::new(0x0200_0002, "Bench", "Calculator");
    ty.visibility = Visibility::Public;

    for i in 0..METHODS {
        let mut method = MethodDefinition::new(0x0600_0001 + i as u32, format!("Op{i}"), int.clone());
        method.parameters = vec![
            ParameterDefinition::new("a", int.clone()),
            ParameterDefinition::new("b", int.clone()),
        ];
        method.body = Some(MethodBody {
            max_stack: 2,
            locals: Vec::new(),
            instructions: vec![
                Instruction::new(0, "ldarg.1", Operand::None),
                Instruction::new(1, "ldarg.2", Operand::None),
                Instruction::new(2, "mul", Operand::None),
                Instruction::new(3, "ldc.i4.s", Operand::Int(i as i64 % 100)),
                Instruction::new(5, "add", Operand::None),
                Instruction::new(6, "ret", Operand::None),
            ],
        });
        ty.methods.push(method);
    }

    Arc::new(ModuleDefinition::new(
        "Bench.dll",
        vec![ty],
        Vec::new(),
        Arc::new(NullResolver),
    ))
}

fn documentation() -> Vec<u8> {
    let mut xml = String::from("<?xml version=\"1.0\"?><doc><members>");
    for i in 0..METHODS {
        xml.push_str(&format!(
            "<member name=\"M:Bench.Calculator.Op{i}(System.Int32,System.Int32)\">\
             <summary>Combines <paramref name=\"a\"/> and <paramref name=\"b\"/> \
             using <see cref=\"T:Bench.Calculator\"/>.</summary></member>"
        ));
    }
    xml.push_str("</members></doc>");
    xml.into_bytes()
}

/// Benchmark rendering declarations only.
fn bench_interface_view(c: &mut Criterion) {
    let decompiler = Decompiler::new(calculator(), DecompilerSettings::for_view(CodeView::Interface));
    let name = FullTypeName::new("Bench", "Calculator");

    c.bench_function("decompile_interface_view", |b| {
        b.iter(|| {
            let text = decompiler.decompile_type_as_string(black_box(&name)).unwrap();
            black_box(text)
        });
    });
}

/// Benchmark rendering with lifted method bodies.
fn bench_full_view(c: &mut Criterion) {
    let decompiler = Decompiler::new(calculator(), DecompilerSettings::for_view(CodeView::Full));
    let name = FullTypeName::new("Bench", "Calculator");

    c.bench_function("decompile_full_view", |b| {
        b.iter(|| {
            let text = decompiler.decompile_type_as_string(black_box(&name)).unwrap();
            black_box(text)
        });
    });
}

/// Benchmark parsing a documentation file.
fn bench_documentation(c: &mut Criterion) {
    let data = documentation();

    c.bench_function("parse_xml_documentation", |b| {
        b.iter(|| {
            let docs = XmlDocumentation::parse(black_box(&data)).unwrap();
            black_box(docs)
        });
    });
}

criterion_group!(
    benches,
    bench_interface_view,
    bench_full_view,
    bench_documentation
);
criterion_main!(benches);
