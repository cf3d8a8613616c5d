//! Decompiler configuration.

use strum::{Display, EnumIter, EnumString};

/// The two presentations a package browser offers for a type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum CodeView {
    /// Declarations only, no member bodies
    Interface,
    /// Declarations with member bodies
    Full,
}

/// Where an opening brace goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
pub enum BraceStyle {
    /// `header {`
    EndOfLine,
    /// `header` then `{` on its own line
    NextLine,
}

/// Layout options of the generated text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattingOptions {
    /// One indentation level
    pub indentation: String,
    /// Braces of `namespace` blocks
    pub namespace_brace_style: BraceStyle,
    /// Braces of class, struct, interface and enum bodies
    pub type_brace_style: BraceStyle,
    /// Braces of method and constructor bodies
    pub method_brace_style: BraceStyle,
    /// Braces of property and event bodies
    pub property_brace_style: BraceStyle,
    /// Braces of `get`/`set` bodies
    pub accessor_brace_style: BraceStyle,
    /// Braces of `if` bodies
    pub statement_brace_style: BraceStyle,
    /// `Foo ()` rather than `Foo()` at call sites
    pub space_before_method_call_parentheses: bool,
    /// `void Foo ()` rather than `void Foo()` in declarations
    pub space_before_method_declaration_parentheses: bool,
    /// `Widget ()` rather than `Widget()` in constructor declarations
    pub space_before_constructor_declaration_parentheses: bool,
}

impl FormattingOptions {
    /// The Mono coding style: tabs, type and method braces on their own line, everything
    /// else at the end of the line, and a space before every parenthesis.
    pub fn mono() -> Self {
        FormattingOptions {
            indentation: "\t".to_string(),
            namespace_brace_style: BraceStyle::NextLine,
            type_brace_style: BraceStyle::NextLine,
            method_brace_style: BraceStyle::NextLine,
            property_brace_style: BraceStyle::EndOfLine,
            accessor_brace_style: BraceStyle::EndOfLine,
            statement_brace_style: BraceStyle::EndOfLine,
            space_before_method_call_parentheses: true,
            space_before_method_declaration_parentheses: true,
            space_before_constructor_declaration_parentheses: true,
        }
    }
}

impl Default for FormattingOptions {
    fn default() -> Self {
        FormattingOptions::mono()
    }
}

/// Behaviour switches of a [`crate::decompiler::Decompiler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompilerSettings {
    /// Text layout
    pub formatting: FormattingOptions,
    /// Emit `/// <summary>` comments from the attached documentation
    pub show_xml_documentation: bool,
    /// Fail when a referenced assembly cannot be resolved, instead of noting it in the output
    pub throw_on_assembly_resolve_errors: bool,
    /// Keep braces around single-statement bodies
    pub always_use_braces: bool,
    /// Write `int X => expr;` for getter-only properties computing a single expression
    pub use_expression_body_for_calculated_getter_only_properties: bool,
    /// Separate every member with a blank line
    pub expand_member_definitions: bool,
    /// Emit member bodies; when off, members end with `;`
    pub decompile_member_bodies: bool,
}

impl Default for DecompilerSettings {
    fn default() -> Self {
        DecompilerSettings {
            formatting: FormattingOptions::mono(),
            show_xml_documentation: true,
            throw_on_assembly_resolve_errors: true,
            always_use_braces: true,
            use_expression_body_for_calculated_getter_only_properties: true,
            expand_member_definitions: true,
            decompile_member_bodies: true,
        }
    }
}

impl DecompilerSettings {
    /// The configuration used by the package browser for `view`.
    ///
    /// Both views share Mono formatting without a space before call, method and
    /// constructor parentheses, hide documentation, tolerate unresolved references, drop
    /// braces from single statements and prefer expression-bodied computed properties.
    /// They differ only in whether member bodies are emitted and members expanded.
    pub fn for_view(view: CodeView) -> Self {
        let mut formatting = FormattingOptions::mono();
        formatting.space_before_method_call_parentheses = false;
        formatting.space_before_method_declaration_parentheses = false;
        formatting.space_before_constructor_declaration_parentheses = false;

        let full = view == CodeView::Full;
        DecompilerSettings {
            formatting,
            show_xml_documentation: false,
            throw_on_assembly_resolve_errors: false,
            always_use_braces: false,
            use_expression_body_for_calculated_getter_only_properties: true,
            expand_member_definitions: full,
            decompile_member_bodies: full,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn views_differ_only_in_body_flags() {
        let interface = DecompilerSettings::for_view(CodeView::Interface);
        let full = DecompilerSettings::for_view(CodeView::Full);

        assert!(!interface.decompile_member_bodies);
        assert!(!interface.expand_member_definitions);
        assert!(full.decompile_member_bodies);
        assert!(full.expand_member_definitions);

        let mut normalized = full.clone();
        normalized.decompile_member_bodies = false;
        normalized.expand_member_definitions = false;
        assert_eq!(normalized, interface);
    }

    #[test]
    fn view_settings() {
        let settings = DecompilerSettings::for_view(CodeView::Full);
        assert!(!settings.show_xml_documentation);
        assert!(!settings.throw_on_assembly_resolve_errors);
        assert!(!settings.always_use_braces);
        assert!(settings.use_expression_body_for_calculated_getter_only_properties);
        assert!(!settings.formatting.space_before_method_call_parentheses);
        assert_eq!(settings.formatting.type_brace_style, BraceStyle::NextLine);
        assert_eq!(settings.formatting.property_brace_style, BraceStyle::EndOfLine);
        assert_eq!(settings.formatting.indentation, "\t");
    }

    #[test]
    fn view_names() {
        assert_eq!(CodeView::Interface.to_string(), "interface");
        assert_eq!("full".parse::<CodeView>().unwrap(), CodeView::Full);
    }
}
