//! The late-binder runtime (spec.md §4.2), emitted verbatim into the
//! preamble up to its mangled function name. Returns a reflective proxy
//! standing in for a not-yet-resolved symbol: every trap calls `binder()`
//! to obtain the real target, rebinds the caller's variable, and
//! forwards the operation onto the real target via `Reflect`.

use crate::ast::Stmt;

/// Builds the `Stmt::Raw` declaring `lateBind(binder, isCallable)` under
/// its mangled name `name`.
pub fn late_bind_stmt(name: &str) -> Stmt {
    let text = format!(
        r#"function {name}(binder, isCallable) {{
    const target = isCallable ? function () {{}} : {{}};
    const handler = {{
        get(_t, prop, receiver) {{
            const real = binder();
            return Reflect.get(real, prop, real);
        }},
        set(_t, prop, value, receiver) {{
            const real = binder();
            return Reflect.set(real, prop, value, real);
        }},
        has(_t, prop) {{
            return Reflect.has(binder(), prop);
        }},
        deleteProperty(_t, prop) {{
            return Reflect.deleteProperty(binder(), prop);
        }},
        ownKeys(_t) {{
            return Reflect.ownKeys(binder());
        }},
        getOwnPropertyDescriptor(_t, prop) {{
            return Reflect.getOwnPropertyDescriptor(binder(), prop);
        }},
        defineProperty(_t, prop, descriptor) {{
            return Reflect.defineProperty(binder(), prop, descriptor);
        }},
        getPrototypeOf(_t) {{
            return Reflect.getPrototypeOf(binder());
        }},
        setPrototypeOf(_t, proto) {{
            return Reflect.setPrototypeOf(binder(), proto);
        }},
        isExtensible(_t) {{
            return Reflect.isExtensible(binder());
        }},
        preventExtensions(_t) {{
            return Reflect.preventExtensions(binder());
        }},
        apply(_t, thisArg, args) {{
            return Reflect.apply(binder(), thisArg, args);
        }},
        construct(_t, args, newTarget) {{
            return Reflect.construct(binder(), args, newTarget);
        }},
    }};
    return new Proxy(target, handler);
}}"#,
        name = name
    );
    Stmt::Raw {
        text,
        declares: vec![name.to_string()],
        free: vec!["Reflect".to_string(), "Proxy".to_string()],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declares_only_its_own_name() {
        let stmt = late_bind_stmt("lateBind_abc123");
        assert_eq!(stmt.declares(), vec!["lateBind_abc123".to_string()]);
    }

    #[test]
    fn references_only_reflect_and_proxy() {
        let stmt = late_bind_stmt("lateBind_abc123");
        if let Stmt::Raw { free, .. } = stmt {
            assert_eq!(free, vec!["Reflect".to_string(), "Proxy".to_string()]);
        } else {
            panic!("expected Raw stmt");
        }
    }
}
