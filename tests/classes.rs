use loxwalk::error::{LoxError, RuntimeError};
use loxwalk::{run, Outcome};

fn exec(source: &str) -> (Outcome, String, Vec<LoxError>) {
    let mut out = Vec::new();
    let mut errors = Vec::new();
    let outcome = run(source, &mut out, &mut errors);
    (outcome, String::from_utf8(out).unwrap(), errors)
}

fn output(source: &str) -> String {
    let (outcome, out, errors) = exec(source);
    assert_eq!(outcome, Outcome::Success, "errors: {:?}", errors);
    out
}

fn runtime_error(source: &str) -> RuntimeError {
    let (outcome, _, mut errors) = exec(source);
    assert_eq!(outcome, Outcome::RuntimeError, "errors: {:?}", errors);
    match errors.remove(0) {
        LoxError::Runtime(e) => e,
        other => panic!("expected a runtime error, got {:?}", other),
    }
}

#[test]
fn initializer_sets_fields_and_methods_read_them() {
    let source = "
        class C {
            init(v) { this.v = v; }
            get() { return this.v; }
        }
        print C(5).get();
    ";
    assert_eq!(output(source), "5\n");
}

#[test]
fn classes_and_instances_display() {
    assert_eq!(
        output("class Bagel {} print Bagel; print Bagel();"),
        "Bagel\nBagel instance\n"
    );
}

#[test]
fn fields_shadow_methods() {
    let source = "
        class Box {
            name() { return \"method\"; }
        }
        var b = Box();
        print b.name();
        b.name = \"field\";
        print b.name;
    ";
    assert_eq!(output(source), "method\nfield\n");
}

#[test]
fn bound_methods_remember_their_receiver() {
    let source = "
        class Person {
            init(name) { this.name = name; }
            greet() { print \"hi \" + this.name; }
        }
        var greet = Person(\"ada\").greet;
        var other = Person(\"bob\");
        other.greet = greet;
        other.greet();
    ";
    assert_eq!(output(source), "hi ada\n");
}

#[test]
fn callbacks_capture_this() {
    let source = "
        class Thing {
            init() { this.label = \"thing\"; }
            callback() {
                fun local() { return this.label; }
                return local;
            }
        }
        print Thing().callback()();
    ";
    assert_eq!(output(source), "thing\n");
}

#[test]
fn init_returns_the_instance() {
    let source = "
        class Foo {
            init() {
                this.count = 1;
                return;
            }
        }
        var foo = Foo();
        print foo.init() == foo;
        print foo.count;
    ";
    assert_eq!(output(source), "true\n1\n");
}

#[test]
fn init_arity_is_the_class_arity() {
    let err = runtime_error("class P { init(x, y) { this.x = x; this.y = y; } }\nP(1);");
    assert_eq!(
        err,
        RuntimeError::ArityMismatch {
            expected: 2,
            got: 1,
            lexeme: ")".into(),
            line: 2,
        }
    );

    let err = runtime_error("class Q {}\nQ(1);");
    assert!(matches!(err, RuntimeError::ArityMismatch { expected: 0, .. }));
}

#[test]
fn static_methods_are_called_on_the_class() {
    let source = "
        class Math {
            static square(n) { return n * n; }
            static twice(n) { return this.square(n) + this.square(n); }
        }
        print Math.square(3);
        print Math.twice(2);
        print Math.square;
    ";
    assert_eq!(output(source), "9\n8\n<fn square>\n");
}

#[test]
fn instance_method_through_class_is_rejected() {
    let err = runtime_error("class A { speak() { return 1; } }\nA.speak();");
    assert_eq!(
        err.to_string(),
        "Can't call non static class method 'speak' on class A.\n[line 2]"
    );
}

#[test]
fn unknown_static_method_is_rejected() {
    let err = runtime_error("class A {}\nA.nope();");
    assert_eq!(
        err,
        RuntimeError::NoSuchStaticMethod {
            name: "nope".into(),
            class: "A".into(),
            line: 2,
        }
    );
}

#[test]
fn static_method_is_not_an_instance_property() {
    let err = runtime_error("class A { static make() { return 1; } }\nA().make();");
    assert_eq!(err.to_string(), "Undefined property 'make'.\n[line 2]");
}

#[test]
fn undeclared_method_on_instance_is_undefined_property() {
    let err = runtime_error("class A {}\nA().missing();");
    assert!(matches!(err, RuntimeError::UndefinedProperty { ref name, line: 2 } if name == "missing"));
}

#[test]
fn property_access_on_non_instances_fails() {
    let err = runtime_error("var n = 1;\nprint n.field;");
    assert_eq!(
        err.to_string(),
        "Only instances have properties, not number.\n[line 2] at 'field'"
    );

    let err = runtime_error("\"s\".field = 1;");
    assert_eq!(err.to_string(), "Only instances have fields.\n[line 1] at 'field'");
}

#[test]
fn instances_compare_by_identity() {
    let source = "
        class P {}
        var a = P();
        var b = P();
        var c = a;
        print a == b;
        print a == c;
    ";
    assert_eq!(output(source), "false\ntrue\n");
}

#[test]
fn classes_declared_in_blocks_resolve_locally() {
    let source = "
        {
            class Local {
                value() { return 7; }
            }
            print Local().value();
        }
    ";
    assert_eq!(output(source), "7\n");
}

#[test]
fn this_outside_class_is_a_static_error() {
    let (outcome, out, errors) = exec("print 1;\nprint this;");
    assert_eq!(outcome, Outcome::StaticError);
    assert!(out.is_empty());
    assert_eq!(
        errors[0].to_string(),
        "[line 2] Error: Can't use 'this' outside of a class."
    );
}
