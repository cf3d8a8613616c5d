//! Hand-built metadata models.
//!
//! `widget_module` mirrors what the reader produces for a small library:
//!
//! ```csharp
//! namespace Acme {
//!     public class Widget {
//!         public const int Limit = 10;
//!         private int _count;
//!         public string Name { get; set; }
//!         public int Count => _count;
//!         public Widget(string name) { Name = name; }
//!         public int Add(int a, int b) { return a + b; }
//!         public void Reset() { if (_count > 10) _count = 0; }
//!     }
//!     public class Gadget { private Vendor.Engine _engine; public void Start() { _engine.Run(); } }
//!     public class Broken { public void Load(<undecodable> data) { } }
//!     public enum Color : byte { Red, Green }
//!     public interface IShape { string Name { get; } double Area(); }
//! }
//! ```

use std::sync::Arc;

use crate::{
    metadata::{
        AssemblyDefinition, AssemblyName, Constant, FieldAttributes, FieldDefinition,
        FieldReference, Instruction, MethodAttributes, MethodBody, MethodDefinition,
        MethodReference, ModuleDefinition, Operand, ParameterDefinition, PrimitiveType,
        PropertyDefinition, TypeAttributes, TypeDefinition, TypeKind, TypeReference, TypeSig,
        Version, Visibility,
    },
    reader::{AssemblyResolver, NullResolver},
};

pub fn corlib() -> AssemblyName {
    AssemblyName::new("System.Runtime", Version::new(8, 0, 0, 0))
}

pub fn vendor_runtime() -> AssemblyName {
    AssemblyName::new("Vendor.Runtime", Version::new(1, 0, 0, 0))
}

fn system(name: &str) -> TypeSig {
    TypeSig::Named(TypeReference::external("System", name, corlib()))
}

fn int() -> TypeSig {
    TypeSig::Primitive(PrimitiveType::Int32)
}

fn string() -> TypeSig {
    TypeSig::Primitive(PrimitiveType::String)
}

fn void() -> TypeSig {
    TypeSig::Primitive(PrimitiveType::Void)
}

fn local(name: &str) -> TypeSig {
    TypeSig::Named(TypeReference::local("Acme", name))
}

fn ins(offset: u32, opcode: &str, operand: Operand) -> Instruction {
    Instruction::new(offset, opcode, operand)
}

fn body(instructions: Vec<Instruction>) -> Option<MethodBody> {
    Some(MethodBody {
        max_stack: 8,
        locals: Vec::new(),
        instructions,
    })
}

fn field_ref(owner: &str, name: &str, field_type: TypeSig) -> Operand {
    Operand::Field(FieldReference {
        declaring_type: local(owner),
        name: name.to_string(),
        field_type,
    })
}

fn accessor(token: u32, name: &str, return_type: TypeSig) -> MethodDefinition {
    let mut method = MethodDefinition::new(token, name, return_type);
    method.attributes |= MethodAttributes::SPECIAL_NAME;
    method
}

pub fn widget_type() -> TypeDefinition {
    let mut ty = TypeDefinition::new(0x0200_0002, "Acme", "Widget");
    ty.visibility = Visibility::Public;
    ty.attributes = TypeAttributes::BEFORE_FIELD_INIT;
    ty.base_type = Some(system("Object"));

    let mut limit = FieldDefinition::new(0x0400_0001, "Limit", int());
    limit.visibility = Visibility::Public;
    limit.attributes = FieldAttributes::STATIC | FieldAttributes::LITERAL | FieldAttributes::HAS_DEFAULT;
    limit.constant = Some(Constant::Int(10));
    ty.fields.push(limit);
    ty.fields.push(FieldDefinition::new(0x0400_0002, "_count", int()));
    ty.fields.push(FieldDefinition::new(0x0400_0003, "<Name>k__BackingField", string()));

    let backing = || field_ref("Widget", "<Name>k__BackingField", string());
    let count = || field_ref("Widget", "_count", int());

    let mut get_name = accessor(0x0600_0001, "get_Name", string());
    get_name.body = body(vec![
        ins(0x00, "ldarg.0", Operand::None),
        ins(0x01, "ldfld", backing()),
        ins(0x06, "ret", Operand::None),
    ]);

    let mut set_name = accessor(0x0600_0002, "set_Name", void());
    set_name.parameters.push(ParameterDefinition::new("value", string()));
    set_name.body = body(vec![
        ins(0x00, "ldarg.0", Operand::None),
        ins(0x01, "ldarg.1", Operand::None),
        ins(0x02, "stfld", backing()),
        ins(0x07, "ret", Operand::None),
    ]);

    let mut get_count = accessor(0x0600_0003, "get_Count", int());
    get_count.body = body(vec![
        ins(0x00, "ldarg.0", Operand::None),
        ins(0x01, "ldfld", count()),
        ins(0x06, "ret", Operand::None),
    ]);

    let mut ctor = accessor(0x0600_0004, ".ctor", void());
    ctor.attributes |= MethodAttributes::RTSPECIAL_NAME;
    ctor.parameters.push(ParameterDefinition::new("name", string()));
    ctor.body = body(vec![
        ins(0x00, "ldarg.0", Operand::None),
        ins(
            0x01,
            "call",
            Operand::Method(MethodReference {
                declaring_type: system("Object"),
                name: ".ctor".to_string(),
                has_this: true,
                parameters: Vec::new(),
                return_type: void(),
            }),
        ),
        ins(0x06, "ldarg.0", Operand::None),
        ins(0x07, "ldarg.1", Operand::None),
        ins(
            0x08,
            "call",
            Operand::Method(MethodReference {
                declaring_type: local("Widget"),
                name: "set_Name".to_string(),
                has_this: true,
                parameters: vec![string()],
                return_type: void(),
            }),
        ),
        ins(0x0d, "ret", Operand::None),
    ]);

    let mut add = MethodDefinition::new(0x0600_0005, "Add", int());
    add.parameters.push(ParameterDefinition::new("a", int()));
    add.parameters.push(ParameterDefinition::new("b", int()));
    add.body = body(vec![
        ins(0x00, "ldarg.1", Operand::None),
        ins(0x01, "ldarg.2", Operand::None),
        ins(0x02, "add", Operand::None),
        ins(0x03, "ret", Operand::None),
    ]);

    let mut reset = MethodDefinition::new(0x0600_0006, "Reset", void());
    reset.body = body(vec![
        ins(0x00, "ldarg.0", Operand::None),
        ins(0x01, "ldfld", count()),
        ins(0x06, "ldc.i4.s", Operand::Int(10)),
        ins(0x08, "ble.s", Operand::Branch(0x11)),
        ins(0x0a, "ldarg.0", Operand::None),
        ins(0x0b, "ldc.i4.0", Operand::None),
        ins(0x0c, "stfld", count()),
        ins(0x11, "ret", Operand::None),
    ]);

    ty.methods = vec![get_name, set_name, get_count, ctor, add, reset];
    ty.properties = vec![
        PropertyDefinition {
            token: 0x1700_0001,
            name: "Name".to_string(),
            property_type: string(),
            parameters: Vec::new(),
            getter: Some(0x0600_0001),
            setter: Some(0x0600_0002),
        },
        PropertyDefinition {
            token: 0x1700_0002,
            name: "Count".to_string(),
            property_type: int(),
            parameters: Vec::new(),
            getter: Some(0x0600_0003),
            setter: None,
        },
    ];
    ty
}

/// A class whose field type lives in `Vendor.Runtime`.
pub fn gadget_type() -> TypeDefinition {
    let engine = TypeSig::Named(TypeReference::external("Vendor", "Engine", vendor_runtime()));

    let mut ty = TypeDefinition::new(0x0200_0003, "Acme", "Gadget");
    ty.visibility = Visibility::Public;
    ty.base_type = Some(system("Object"));
    ty.fields.push(FieldDefinition::new(0x0400_0004, "_engine", engine.clone()));

    let mut start = MethodDefinition::new(0x0600_0007, "Start", void());
    start.body = body(vec![
        ins(0x00, "ldarg.0", Operand::None),
        ins(0x01, "ldfld", field_ref("Gadget", "_engine", engine.clone())),
        ins(
            0x06,
            "callvirt",
            Operand::Method(MethodReference {
                declaring_type: engine,
                name: "Run".to_string(),
                has_this: true,
                parameters: Vec::new(),
                return_type: void(),
            }),
        ),
        ins(0x0b, "ret", Operand::None),
    ]);
    ty.methods.push(start);
    ty
}

/// A class with a parameter whose signature could not be decoded.
pub fn broken_type() -> TypeDefinition {
    let mut ty = TypeDefinition::new(0x0200_0004, "Acme", "Broken");
    ty.visibility = Visibility::Public;
    ty.base_type = Some(system("Object"));

    let mut load = MethodDefinition::new(0x0600_0008, "Load", void());
    load.parameters.push(ParameterDefinition::new(
        "data",
        TypeSig::Invalid("unknown element type 0x99".to_string()),
    ));
    load.body = body(vec![ins(0x00, "ret", Operand::None)]);
    ty.methods.push(load);
    ty
}

pub fn color_type() -> TypeDefinition {
    let mut ty = TypeDefinition::new(0x0200_0005, "Acme", "Color");
    ty.visibility = Visibility::Public;
    ty.attributes = TypeAttributes::SEALED;
    ty.base_type = Some(system("Enum"));
    ty.kind = TypeKind::Enum;

    let mut value = FieldDefinition::new(0x0400_0005, "value__", TypeSig::Primitive(PrimitiveType::Byte));
    value.visibility = Visibility::Public;
    value.attributes = FieldAttributes::SPECIAL_NAME | FieldAttributes::RTSPECIAL_NAME;
    ty.fields.push(value);

    for (i, name) in ["Red", "Green"].into_iter().enumerate() {
        let mut member = FieldDefinition::new(0x0400_0006 + i as u32, name, local("Color"));
        member.visibility = Visibility::Public;
        member.attributes =
            FieldAttributes::STATIC | FieldAttributes::LITERAL | FieldAttributes::HAS_DEFAULT;
        member.constant = Some(Constant::UInt(i as u64));
        ty.fields.push(member);
    }
    ty
}

pub fn shape_type() -> TypeDefinition {
    let mut ty = TypeDefinition::new(0x0200_0006, "Acme", "IShape");
    ty.visibility = Visibility::Public;
    ty.attributes = TypeAttributes::INTERFACE | TypeAttributes::ABSTRACT;
    ty.kind = TypeKind::Interface;

    let slot = MethodAttributes::ABSTRACT | MethodAttributes::VIRTUAL | MethodAttributes::NEW_SLOT;
    let mut get_name = accessor(0x0600_0009, "get_Name", string());
    get_name.attributes |= slot;
    let mut area = MethodDefinition::new(0x0600_000A, "Area", TypeSig::Primitive(PrimitiveType::Double));
    area.attributes |= slot;

    ty.methods = vec![get_name, area];
    ty.properties.push(PropertyDefinition {
        token: 0x1700_0003,
        name: "Name".to_string(),
        property_type: string(),
        parameters: Vec::new(),
        getter: Some(0x0600_0009),
        setter: None,
    });
    ty
}

pub fn widget_module_with(resolver: Arc<dyn AssemblyResolver>) -> ModuleDefinition {
    ModuleDefinition::new(
        "Acme.Widgets.dll",
        vec![widget_type(), gadget_type(), broken_type(), color_type(), shape_type()],
        vec![corlib(), vendor_runtime()],
        resolver,
    )
}

pub fn widget_module() -> Arc<ModuleDefinition> {
    Arc::new(widget_module_with(Arc::new(NullResolver)))
}

pub fn widget_assembly() -> AssemblyDefinition {
    AssemblyDefinition::new(
        AssemblyName::new("Acme.Widgets", Version::new(1, 2, 0, 0)),
        widget_module_with(Arc::new(NullResolver)),
    )
}
