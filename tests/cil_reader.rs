//! Reads a compiled assembly end to end, from package entry to rendered source.

use std::{
    io::{Cursor, Write},
    path::PathBuf,
    sync::Arc,
};

use nuscope::{
    metadata::{FullTypeName, Operand, TypeScope, TypeSig, Version},
    package::{PackageArchive, PackageAssembly},
    reader::NullResolver,
};
use zip::{write::SimpleFileOptions, ZipWriter};

const DLL: &str = "lib/net8.0/Acme.Widgets.dll";

fn init() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// `tests/samples/Acme.Widgets.dll` as the only entry of a package.
fn widgets() -> PackageAssembly {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/samples/Acme.Widgets.dll");
    let data = std::fs::read(path).unwrap();

    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer.start_file(DLL, SimpleFileOptions::default()).unwrap();
    writer.write_all(&data).unwrap();
    let archive = PackageArchive::open(writer.finish().unwrap().into_inner()).unwrap();

    let file = archive.entry(DLL).unwrap().unwrap();
    PackageAssembly::new(file, Arc::new(NullResolver))
}

fn assembly_scope(sig: &TypeSig) -> Option<&str> {
    match sig {
        TypeSig::Named(reference) => match &reference.scope {
            TypeScope::Assembly(name) => Some(name.name.as_str()),
            _ => None,
        },
        _ => None,
    }
}

#[test]
fn definition() {
    init();
    let definition = widgets().definition().unwrap().unwrap();

    assert_eq!(definition.name.name, "Acme.Widgets");
    assert_eq!(definition.name.version, Version::new(1, 2, 0, 0));

    let module = &definition.main_module;
    let references: Vec<&str> = module
        .assembly_references
        .iter()
        .map(|reference| reference.name.as_str())
        .collect();
    assert_eq!(references, ["System.Runtime", "Vendor.Runtime"]);

    let types: Vec<String> = module
        .all_types()
        .into_iter()
        .filter(|ty| !ty.name.starts_with('<'))
        .map(|ty| ty.full_type_name().to_string())
        .collect();
    assert_eq!(types, ["Acme.Widget", "Acme.Widget+Part"]);
}

#[test]
fn members() {
    init();
    let definition = widgets().definition().unwrap().unwrap();
    let widget = definition
        .main_module
        .find_type(&FullTypeName::parse("Acme.Widget").unwrap())
        .unwrap();

    let engine = widget.fields.iter().find(|field| field.name == "_engine").unwrap();
    assert_eq!(assembly_scope(&engine.field_type), Some("Vendor.Runtime"));

    let ctor = widget.methods.iter().find(|method| method.name == ".ctor").unwrap();
    let body = ctor.body.as_ref().unwrap();
    assert_eq!(body.instructions.len(), 3);
    let Operand::Method(base) = &body.instructions[1].operand else {
        panic!("expected a method operand, got {:?}", body.instructions[1].operand);
    };
    assert_eq!(base.name, ".ctor");
    assert!(base.has_this);
    assert_eq!(assembly_scope(&base.declaring_type), Some("System.Runtime"));
    match &base.declaring_type {
        TypeSig::Named(reference) => {
            assert_eq!(reference.namespace, "System");
            assert_eq!(reference.name, "Object");
        }
        other => panic!("unexpected declaring type {other:?}"),
    }

    let add = widget.methods.iter().find(|method| method.name == "Add").unwrap();
    let opcodes: Vec<&str> = add
        .body
        .as_ref()
        .unwrap()
        .instructions
        .iter()
        .map(|instruction| instruction.opcode.as_str())
        .collect();
    assert_eq!(opcodes, ["ldarg.1", "ldarg.2", "add", "ret"]);
}

#[tokio::test]
async fn views() {
    init();
    let assembly = widgets();
    let name = FullTypeName::parse("Acme.Widget").unwrap();

    let full = assembly.type_code(&name).await;
    assert!(full.contains(
        "// Unresolved reference: Vendor.Runtime, Version=1.0.0.0, Culture=neutral, PublicKeyToken=null\n"
    ));
    assert!(full.contains("using Vendor;"));
    assert!(full.contains("private Engine _engine;"));
    assert!(full.contains("public int Add(int a, int b)\n\t\t{\n\t\t\treturn a + b;\n\t\t}"));
    assert!(full.contains("public class Part"));

    let interface = assembly.type_interface_code(&name).await;
    assert!(interface.contains("public int Add(int a, int b);"));
    assert!(!interface.contains("return"));
}
