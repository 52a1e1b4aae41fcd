// Object instances and the per-call parameter-frame stack (SPEC_FULL.md
// §3, §4.5).
//
// Grounded on `env.rs`'s `Env<T>` lexical scope chain, but adapted: the
// teacher chains parent/child `Env`s for nested lexical scoping, while
// Brewin only ever has two resolution levels (the innermost parameter
// frame, then the instance's own fields — §3's "Names in a method body
// resolve to the innermost parameter frame if present, otherwise to the
// instance's own field"), so the chain collapses to "one stack of frames
// plus one field map" rather than a tree of `Env`s.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::class::ClassDescriptor;
use crate::class::ClassRegistry;
use crate::error::{BrewinError, Result};
use crate::value::Value;

pub struct ObjectInstance {
    pub class_name: String,
    pub fields: HashMap<String, Value>,
    pub registry: Rc<ClassRegistry>,
    pub frames: Vec<HashMap<String, Value>>,
}

impl ObjectInstance {
    pub fn new(
        class: &Rc<ClassDescriptor>,
        registry: &Rc<ClassRegistry>,
    ) -> Result<Rc<RefCell<ObjectInstance>>> {
        let mut fields = HashMap::with_capacity(class.fields.len());
        for (name, init) in &class.fields {
            let value = Value::from_atom(&init.text, init.line, registry)?;
            fields.insert(name.clone(), value);
        }

        Ok(Rc::new(RefCell::new(ObjectInstance {
            class_name: class.name.clone(),
            fields,
            registry: registry.clone(),
            frames: Vec::new(),
        })))
    }

    pub fn get_method(&self, name: &str) -> Option<Rc<crate::class::MethodDescriptor>> {
        self.registry
            .classes
            .get(&self.class_name)
            .and_then(|c| c.methods.get(name).cloned())
    }

    /// Resolve a name: innermost parameter frame first, then fields.
    pub fn resolve(&self, name: &str) -> Option<Value> {
        if let Some(frame) = self.frames.last() {
            if let Some(v) = frame.get(name) {
                return Some(v.clone());
            }
        }
        self.fields.get(name).cloned()
    }

    /// Assign to a name with the same resolution order as `resolve`.
    /// Unknown name -> NameError.
    pub fn assign(&mut self, name: &str, value: Value, line: usize) -> Result<()> {
        if let Some(frame) = self.frames.last_mut() {
            if frame.contains_key(name) {
                frame.insert(name.to_string(), value);
                return Ok(());
            }
        }
        if self.fields.contains_key(name) {
            self.fields.insert(name.to_string(), value);
            return Ok(());
        }
        Err(BrewinError::name_error(format!("assignment to unknown name '{}'", name), line))
    }
}

/// RAII guard that pops a parameter frame on drop, so the frame is released
/// on every exit path out of a method call — including one unwound by `?`
/// partway through the body (SPEC_FULL.md §5, §11).
pub struct FrameGuard {
    instance: Rc<RefCell<ObjectInstance>>,
}

impl FrameGuard {
    pub fn push(instance: Rc<RefCell<ObjectInstance>>, frame: HashMap<String, Value>) -> FrameGuard {
        instance.borrow_mut().frames.push(frame);
        FrameGuard { instance }
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        self.instance.borrow_mut().frames.pop();
    }
}
