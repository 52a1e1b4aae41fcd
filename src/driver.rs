// Program driver (SPEC_FULL.md §4.6): source text -> parsed forms -> class
// registry -> a `main` instance -> `main()` invoked with no arguments.
//
// Grounded on `vm.rs`'s top-level `run` function, which does the same
// "parse, build, locate an entry point, execute" sequence before handing
// off to the per-instruction loop.

use std::rc::Rc;

use tracing::{debug, info};

use crate::class::ClassRegistry;
use crate::error::{BrewinError, Result};
use crate::host::Host;
use crate::interp;
use crate::object::ObjectInstance;
use crate::parser;

/// Parse, build, and run `source`'s `main` class's `main()` method, with
/// `host` as the program's input/output environment. Returns the method's
/// result value.
pub fn run_program(source: &str, host: &mut dyn Host) -> Result<crate::value::Value> {
    let program = parser::parse(source)?;
    debug!(forms = program.len(), "parsed program");

    let registry = Rc::new(ClassRegistry::build(&program)?);
    debug!(classes = registry.classes.len(), "built class registry");

    let main_class = registry.lookup("main", 0)?.clone();

    let instance = ObjectInstance::new(&main_class, &registry)?;

    info!("running main()");
    interp::call_method(&instance, "main", Vec::new(), host, 0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::BufferHost;

    #[test]
    fn runs_a_minimal_program() {
        let mut host = BufferHost::new(Vec::<String>::new());
        let result = run_program(
            r#"(class main (method main () (begin (print "hello") (return 0))))"#,
            &mut host,
        )
        .unwrap();
        assert!(matches!(result, crate::value::Value::Int(0)));
        assert_eq!(host.output, vec!["hello".to_string()]);
    }

    #[test]
    fn missing_main_class_is_a_type_error() {
        let mut host = BufferHost::new(Vec::<String>::new());
        let err = run_program("(class other (method m () (return 1)))", &mut host).unwrap_err();
        assert!(matches!(err, BrewinError::Type { .. }));
    }
}
