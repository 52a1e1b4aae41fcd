// Class registry and descriptors (SPEC_FULL.md §4.2).
//
// Grounded on the teacher's descriptor-struct idiom (`ast.rs::Program`,
// `config.rs::Config`): a small, mostly-data struct built once from the
// parsed form and then handed out by reference. Field initializers are
// kept as the raw parser atom (§4.1 defers their Value conversion to
// object-construction time) rather than pre-converted, since a field whose
// initializer names a class can't be resolved to a Value until the whole
// program's classes are known.

use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{BrewinError, Result};
use crate::node::Node;
use crate::parser;

#[derive(Debug, Clone)]
pub struct MethodDescriptor {
    pub name: String,
    pub params: Vec<String>,
    pub body: Rc<Node>,
}

#[derive(Debug, Clone)]
pub struct FieldInit {
    pub text: String,
    pub line: usize,
}

#[derive(Debug)]
pub struct ClassDescriptor {
    pub name: String,
    pub fields: Vec<(String, FieldInit)>,
    pub methods: HashMap<String, Rc<MethodDescriptor>>,
}

#[derive(Debug, Default)]
pub struct ClassRegistry {
    pub classes: HashMap<String, Rc<ClassDescriptor>>,
}

impl ClassRegistry {
    pub fn build(program: &[Node]) -> Result<ClassRegistry> {
        let mut classes = HashMap::new();

        for form in program {
            let descriptor = build_class(form)?;
            if classes.contains_key(&descriptor.name) {
                return Err(BrewinError::type_error(
                    format!("duplicate class '{}'", descriptor.name),
                    form.line(),
                ));
            }
            classes.insert(descriptor.name.clone(), Rc::new(descriptor));
        }

        Ok(ClassRegistry { classes })
    }

    pub fn lookup(&self, name: &str, line: usize) -> Result<&Rc<ClassDescriptor>> {
        self.classes
            .get(name)
            .ok_or_else(|| BrewinError::type_error(format!("unknown class '{}'", name), line))
    }
}

fn build_class(form: &Node) -> Result<ClassDescriptor> {
    let items = form
        .as_list()
        .ok_or_else(|| BrewinError::syntax_error("expected a class form", form.line()))?;

    if items.first().and_then(Node::as_atom) != Some("class") {
        return Err(BrewinError::syntax_error("expected 'class'", form.line()));
    }

    let name = items
        .get(1)
        .and_then(Node::as_atom)
        .ok_or_else(|| BrewinError::syntax_error("expected a class name", form.line()))?;

    if !parser::looks_like_identifier(name) {
        return Err(BrewinError::syntax_error(
            format!("'{}' is not a valid class name", name),
            form.line(),
        ));
    }

    let mut fields: Vec<(String, FieldInit)> = Vec::new();
    let mut methods: HashMap<String, Rc<MethodDescriptor>> = HashMap::new();

    for member in &items[2..] {
        let member_items = member
            .as_list()
            .ok_or_else(|| BrewinError::syntax_error("expected a field or method form", member.line()))?;

        match member_items.first().and_then(Node::as_atom) {
            Some("field") => {
                let field = build_field(member_items, member.line())?;
                if fields.iter().any(|(n, _)| n == &field.0) {
                    return Err(BrewinError::name_error(
                        format!("duplicate field '{}' in class '{}'", field.0, name),
                        member.line(),
                    ));
                }
                fields.push(field);
            }
            Some("method") => {
                let method = build_method(member_items, member.line())?;
                if methods.contains_key(&method.name) {
                    return Err(BrewinError::name_error(
                        format!("duplicate method '{}' in class '{}'", method.name, name),
                        member.line(),
                    ));
                }
                methods.insert(method.name.clone(), Rc::new(method));
            }
            _ => {
                return Err(BrewinError::syntax_error(
                    "expected 'field' or 'method'",
                    member.line(),
                ));
            }
        }
    }

    Ok(ClassDescriptor { name: name.to_string(), fields, methods })
}

fn build_field(items: &[Node], line: usize) -> Result<(String, FieldInit)> {
    let name = items
        .get(1)
        .and_then(Node::as_atom)
        .ok_or_else(|| BrewinError::syntax_error("expected a field name", line))?;
    let init = items
        .get(2)
        .and_then(Node::as_atom)
        .ok_or_else(|| BrewinError::syntax_error("field initializer must be a literal", line))?;
    Ok((name.to_string(), FieldInit { text: init.to_string(), line: items[2].line() }))
}

fn build_method(items: &[Node], line: usize) -> Result<MethodDescriptor> {
    let name = items
        .get(1)
        .and_then(Node::as_atom)
        .ok_or_else(|| BrewinError::syntax_error("expected a method name", line))?;

    let param_list = items
        .get(2)
        .and_then(Node::as_list)
        .ok_or_else(|| BrewinError::syntax_error("expected a parameter list", line))?;

    let mut params = Vec::with_capacity(param_list.len());
    for p in param_list {
        let pname = p
            .as_atom()
            .ok_or_else(|| BrewinError::syntax_error("parameter names must be atoms", p.line()))?;
        if params.contains(&pname.to_string()) {
            return Err(BrewinError::name_error(
                format!("duplicate parameter '{}' in method '{}'", pname, name),
                p.line(),
            ));
        }
        params.push(pname.to_string());
    }

    let body = items
        .get(3)
        .ok_or_else(|| BrewinError::syntax_error("method is missing a body", line))?;

    Ok(MethodDescriptor { name: name.to_string(), params, body: Rc::new(body.clone()) })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn builds_fields_and_methods() {
        let program = parse(
            "(class main (field result 1) (method main () (begin (print result))))",
        )
        .unwrap();
        let registry = ClassRegistry::build(&program).unwrap();
        let main = registry.classes.get("main").unwrap();
        assert_eq!(main.fields[0].0, "result");
        assert!(main.methods.contains_key("main"));
    }

    #[test]
    fn duplicate_class_name_is_type_error() {
        let program = parse("(class a (field x 1)) (class a (field y 2))").unwrap();
        assert!(matches!(
            ClassRegistry::build(&program),
            Err(BrewinError::Type { .. })
        ));
    }

    #[test]
    fn duplicate_field_is_name_error() {
        let program = parse("(class a (field x 1) (field x 2))").unwrap();
        assert!(matches!(
            ClassRegistry::build(&program),
            Err(BrewinError::Name { .. })
        ));
    }

    #[test]
    fn duplicate_method_is_name_error() {
        let program = parse(
            "(class a (method m () (begin)) (method m () (begin)))",
        )
        .unwrap();
        assert!(matches!(
            ClassRegistry::build(&program),
            Err(BrewinError::Name { .. })
        ));
    }
}
