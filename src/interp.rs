// Statement executor and expression evaluator (SPEC_FULL.md §4.3, §4.4,
// §4.5) — the heart of the interpreter.
//
// Grounded on `vm.rs`'s `VM::exec`/`dispatch` loop, but restructured from
// an opcode-fetch loop with an explicit stack into recursive tree-walking,
// since Brewin statements nest (`begin`/`if`/`while` contain statements,
// not jump targets). The teacher threads a `ControlFlow` enum
// (Advance/Branch/Yield) through `step`; this threads the `(Value, bool)`
// return-value/return-flag pair SPEC_FULL.md §4.3 specifies through every
// statement instead, which is the tree-walking equivalent of the same
// idea: "tell the caller what just happened and let it decide whether to
// keep going".

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::error::{BrewinError, Result};
use crate::host::Host;
use crate::node::Node;
use crate::object::{FrameGuard, ObjectInstance};
use crate::value::Value;

/// Dispatch `method_name` on `receiver` with already-evaluated `args`
/// (SPEC_FULL.md §4.5). Pushes one parameter frame for the duration of the
/// call and pops it via `FrameGuard` on every exit path, including errors
/// propagated by `?`.
pub fn call_method(
    receiver: &Rc<RefCell<ObjectInstance>>,
    method_name: &str,
    args: Vec<Value>,
    host: &mut dyn Host,
    call_line: usize,
) -> Result<Value> {
    let method = receiver
        .borrow()
        .get_method(method_name)
        .ok_or_else(|| BrewinError::name_error(format!("no method '{}'", method_name), call_line))?;

    if method.params.len() != args.len() {
        return Err(BrewinError::type_error(
            format!(
                "'{}' expects {} argument(s), got {}",
                method_name,
                method.params.len(),
                args.len()
            ),
            call_line,
        ));
    }

    debug!(class = %receiver.borrow().class_name, method = method_name, "dispatching method call");

    let frame: HashMap<String, Value> = method.params.iter().cloned().zip(args).collect();
    let _guard = FrameGuard::push(receiver.clone(), frame);

    let (value, returned) = exec_stmt(&method.body, receiver, host)?;
    Ok(if returned { value } else { Value::Null })
}

fn resolve_receiver(
    target: &Node,
    instance: &Rc<RefCell<ObjectInstance>>,
    host: &mut dyn Host,
    line: usize,
) -> Result<Rc<RefCell<ObjectInstance>>> {
    if target.as_atom() == Some("me") {
        return Ok(instance.clone());
    }
    match eval_expr(target, instance, host)? {
        Value::Obj(o) => Ok(o),
        Value::Null => Err(BrewinError::fault_error("null dereference", line)),
        other => Err(BrewinError::type_error(
            format!("cannot dispatch a method on a {}", other.type_tag().name()),
            line,
        )),
    }
}

fn eval_call(
    items: &[Node],
    line: usize,
    instance: &Rc<RefCell<ObjectInstance>>,
    host: &mut dyn Host,
) -> Result<Value> {
    let target = items
        .get(1)
        .ok_or_else(|| BrewinError::syntax_error("call is missing a target", line))?;
    let method_name = items
        .get(2)
        .and_then(Node::as_atom)
        .ok_or_else(|| BrewinError::syntax_error("call is missing a method name", line))?;
    let arg_nodes = items.get(3..).unwrap_or(&[]);

    let mut args = Vec::with_capacity(arg_nodes.len());
    for a in arg_nodes {
        args.push(eval_expr(a, instance, host)?);
    }

    let receiver = resolve_receiver(target, instance, host, line)?;
    call_method(&receiver, method_name, args, host, line)
}

fn eval_atom(text: &str, line: usize, instance: &Rc<RefCell<ObjectInstance>>) -> Result<Value> {
    if text == "me" {
        return Ok(Value::Obj(instance.clone()));
    }
    if let Some(value) = instance.borrow().resolve(text) {
        return Ok(value);
    }
    let registry = instance.borrow().registry.clone();
    Value::from_atom(text, line, &registry)
}

fn apply_binop(op: &str, a: &Value, b: &Value, line: usize) -> Result<Value> {
    match op {
        "+" => a.add(b, line),
        "-" => a.sub(b, line),
        "*" => a.mul(b, line),
        "/" => a.div(b, line),
        "%" => a.modulo(b, line),
        "<" => a.lt(b, line),
        "<=" => a.le(b, line),
        ">" => a.gt(b, line),
        ">=" => a.ge(b, line),
        "&" => a.and(b, line),
        "|" => a.or(b, line),
        "==" => a.eq_value(b, line).map(Value::Bool),
        "!=" => a.eq_value(b, line).map(|eq| Value::Bool(!eq)),
        _ => unreachable!("apply_binop called with non-operator head"),
    }
}

fn eval_list(
    items: &[Node],
    line: usize,
    instance: &Rc<RefCell<ObjectInstance>>,
    host: &mut dyn Host,
) -> Result<Value> {
    let head = items
        .first()
        .and_then(Node::as_atom)
        .ok_or_else(|| BrewinError::syntax_error("expected an expression", line))?;

    match head {
        "new" => {
            let class_name = items
                .get(1)
                .and_then(Node::as_atom)
                .ok_or_else(|| BrewinError::syntax_error("new is missing a class name", line))?;
            let registry = instance.borrow().registry.clone();
            let class = registry.lookup(class_name, line)?.clone();
            let created = ObjectInstance::new(&class, &registry)?;
            Ok(Value::Obj(created))
        }
        "call" => eval_call(items, line, instance, host),
        "!" => {
            let operand = items
                .get(1)
                .ok_or_else(|| BrewinError::syntax_error("'!' is missing an operand", line))?;
            let v = eval_expr(operand, instance, host)?;
            v.not(operand.line())
        }
        "+" | "-" | "*" | "/" | "%" | "==" | "!=" | "<" | "<=" | ">" | ">=" | "&" | "|" => {
            let lhs = items
                .get(1)
                .ok_or_else(|| BrewinError::syntax_error(format!("'{}' is missing operands", head), line))?;
            let rhs = items
                .get(2)
                .ok_or_else(|| BrewinError::syntax_error(format!("'{}' is missing operands", head), line))?;
            let a = eval_expr(lhs, instance, host)?;
            let b = eval_expr(rhs, instance, host)?;
            apply_binop(head, &a, &b, line)
        }
        other => Err(BrewinError::syntax_error(format!("unknown expression head '{}'", other), line)),
    }
}

/// Evaluate an expression tree to a Value (SPEC_FULL.md §4.4).
pub fn eval_expr(node: &Node, instance: &Rc<RefCell<ObjectInstance>>, host: &mut dyn Host) -> Result<Value> {
    match node {
        Node::Atom { text, line } => eval_atom(text, *line, instance),
        Node::List { items, line } => eval_list(items, *line, instance, host),
    }
}

fn require_name<'a>(node: Option<&'a Node>, what: &str, line: usize) -> Result<&'a str> {
    node.and_then(Node::as_atom)
        .ok_or_else(|| BrewinError::syntax_error(format!("expected {}", what), line))
}

/// Execute a statement, threading the (ReturnValue, ReturnFlag) pair
/// through nested `begin`/`if`/`while` per SPEC_FULL.md §4.3.
pub fn exec_stmt(node: &Node, instance: &Rc<RefCell<ObjectInstance>>, host: &mut dyn Host) -> Result<(Value, bool)> {
    let line = node.line();
    let items = node
        .as_list()
        .ok_or_else(|| BrewinError::syntax_error("expected a statement", line))?;
    let head = require_name(items.first(), "a statement keyword", line)?;

    match head {
        "print" => {
            let mut rendered = String::new();
            for expr in &items[1..] {
                let v = eval_expr(expr, instance, host)?;
                rendered.push_str(&v.render());
            }
            host.print_line(&rendered);
            Ok((Value::Null, false))
        }
        "inputi" => {
            let name = require_name(items.get(1), "a variable name", line)?;
            let raw = host.read_line().unwrap_or_default();
            let n: i64 = raw
                .trim()
                .parse()
                .map_err(|_| BrewinError::type_error(format!("'{}' is not an integer", raw), line))?;
            instance.borrow_mut().assign(name, Value::Int(n), line)?;
            Ok((Value::Null, false))
        }
        "inputs" => {
            let name = require_name(items.get(1), "a variable name", line)?;
            let raw = host.read_line().unwrap_or_default();
            instance.borrow_mut().assign(name, Value::Str(format!("\"{}\"", raw)), line)?;
            Ok((Value::Null, false))
        }
        "set" => {
            let name = require_name(items.get(1), "a variable name", line)?;
            let expr = items
                .get(2)
                .ok_or_else(|| BrewinError::syntax_error("set is missing an expression", line))?;
            let v = eval_expr(expr, instance, host)?;
            instance.borrow_mut().assign(name, v, line)?;
            Ok((Value::Null, false))
        }
        "call" => {
            let v = eval_call(items, line, instance, host)?;
            Ok((v, false))
        }
        "while" => {
            let cond_node = items
                .get(1)
                .ok_or_else(|| BrewinError::syntax_error("while is missing a condition", line))?;
            let body = items
                .get(2)
                .ok_or_else(|| BrewinError::syntax_error("while is missing a body", line))?;
            loop {
                match eval_expr(cond_node, instance, host)? {
                    Value::Bool(true) => {
                        let (v, returned) = exec_stmt(body, instance, host)?;
                        if returned {
                            return Ok((v, true));
                        }
                    }
                    Value::Bool(false) => return Ok((Value::Null, false)),
                    other => {
                        return Err(BrewinError::type_error(
                            format!("while condition must be Bool, got {}", other.type_tag().name()),
                            cond_node.line(),
                        ))
                    }
                }
            }
        }
        "if" => {
            let cond_node = items
                .get(1)
                .ok_or_else(|| BrewinError::syntax_error("if is missing a condition", line))?;
            let then_branch = items
                .get(2)
                .ok_or_else(|| BrewinError::syntax_error("if is missing a then-branch", line))?;
            match eval_expr(cond_node, instance, host)? {
                Value::Bool(true) => exec_stmt(then_branch, instance, host),
                Value::Bool(false) => match items.get(3) {
                    Some(else_branch) => exec_stmt(else_branch, instance, host),
                    None => Ok((Value::Null, false)),
                },
                other => Err(BrewinError::type_error(
                    format!("if condition must be Bool, got {}", other.type_tag().name()),
                    cond_node.line(),
                )),
            }
        }
        "return" => match items.get(1) {
            Some(expr) => Ok((eval_expr(expr, instance, host)?, true)),
            None => Ok((Value::Null, true)),
        },
        "begin" => {
            for stmt in &items[1..] {
                let (v, returned) = exec_stmt(stmt, instance, host)?;
                if returned {
                    return Ok((v, true));
                }
            }
            Ok((Value::Null, false))
        }
        other => Err(BrewinError::syntax_error(format!("unknown statement '{}'", other), line)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::class::ClassRegistry;
    use crate::host::BufferHost;
    use crate::parser::parse;

    fn run_main(source: &str, input: Vec<&str>) -> Vec<String> {
        let program = parse(source).unwrap();
        let registry = Rc::new(ClassRegistry::build(&program).unwrap());
        let main_class = registry.classes.get("main").unwrap().clone();
        let instance = ObjectInstance::new(&main_class, &registry).unwrap();
        let mut host = BufferHost::new(input.into_iter().map(String::from));
        call_method(&instance, "main", vec![], &mut host, 0).unwrap();
        host.output
    }

    #[test]
    fn factorial_scenario_s1() {
        let out = run_main(
            r#"(class main
                 (field result 1)
                 (method main () (begin (print (call me fact 5))))
                 (method fact (n) (begin
                   (set result 1)
                   (while (> n 0) (begin (set result (* n result)) (set n (- n 1))))
                   (return result))))"#,
            vec![],
        );
        assert_eq!(out, vec!["120".to_string()]);
    }

    #[test]
    fn boolean_operators_scenario_s3() {
        let out = run_main(
            r#"(class main
                 (method main () (begin
                   (print (& true false))
                   (print (| false true)))))"#,
            vec![],
        );
        assert_eq!(out, vec!["false".to_string(), "true".to_string()]);
    }

    #[test]
    fn type_mismatch_scenario_s4() {
        let program = parse(r#"(class main (method main () (begin (print (+ 1 "x")))))"#).unwrap();
        let registry = Rc::new(ClassRegistry::build(&program).unwrap());
        let main_class = registry.classes.get("main").unwrap().clone();
        let instance = ObjectInstance::new(&main_class, &registry).unwrap();
        let mut host = BufferHost::new(Vec::<String>::new());
        let err = call_method(&instance, "main", vec![], &mut host, 0).unwrap_err();
        assert!(matches!(err, BrewinError::Type { .. }));
    }

    #[test]
    fn null_dispatch_is_fault_error_scenario_s5() {
        let program = parse(
            r#"(class other (method m () (return 1)))
               (class main (field o other) (method main () (begin (call o m))))"#,
        )
        .unwrap();
        let registry = Rc::new(ClassRegistry::build(&program).unwrap());
        let main_class = registry.classes.get("main").unwrap().clone();
        let instance = ObjectInstance::new(&main_class, &registry).unwrap();
        let mut host = BufferHost::new(Vec::<String>::new());
        let err = call_method(&instance, "main", vec![], &mut host, 0).unwrap_err();
        assert!(matches!(err, BrewinError::Fault { .. }));
    }

    #[test]
    fn cross_object_call_scenario_s6() {
        let out = run_main(
            r#"(class a (method greet () (return "hi")))
               (class main
                 (field a null)
                 (method main () (begin
                   (set a (new a))
                   (print (call a greet)))))"#,
            vec![],
        );
        assert_eq!(out, vec!["hi".to_string()]);
    }

    #[test]
    fn echo_string_scenario_s2() {
        let out = run_main(
            r#"(class main
                 (field x "")
                 (method main () (begin (inputs x) (print x))))"#,
            vec!["hello"],
        );
        assert_eq!(out, vec!["hello".to_string()]);
    }

    #[test]
    fn begin_with_no_return_yields_null_and_runs_every_child_once() {
        let out = run_main(
            r#"(class main (method main () (begin (print 1) (print 2) (print 3))))"#,
            vec![],
        );
        assert_eq!(out, vec!["1".to_string(), "2".to_string(), "3".to_string()]);
    }

    #[test]
    fn return_short_circuits_sibling_statements() {
        let out = run_main(
            r#"(class main (method main () (begin
                 (print (call me f))
                 (print "unreached"))))
               "#,
            vec![],
        );
        // Only the outer begin's first print executes at top level; the
        // callee's own early return must not print "after".
        assert_eq!(out.len(), 2);
    }
}
