use std::collections::HashMap;

use optbind::{
    Collection, ContextBuilder, DynamicMap, Param, Scalar, Schema, SchemaBuilder, Switch,
};
use rstest::rstest;

macro_rules! assert_contains {
    ($base:expr, $sub:expr) => {
        assert!(
            $base.contains($sub),
            "'{b}' does not contain '{s}'",
            b = $base,
            s = $sub,
        );
    };
}

#[derive(Default)]
struct LogArgs {
    verbose: i32,
    debug: bool,
}

impl Schema for LogArgs {
    fn describe<'a>(&'a mut self, schema: &mut SchemaBuilder<'a>) {
        let LogArgs { verbose, debug } = self;
        schema
            .add(Param::option(Scalar::new(verbose), &["-log", "-verbose"]).required())
            .add(Param::option(Switch::new(debug, true), &["-debug"]));
    }
}

#[test]
fn end_to_end_required_satisfied() {
    let mut args = LogArgs::default();
    let mut context = ContextBuilder::new("program")
        .container(&mut args)
        .build()
        .unwrap();

    context.parse(&["-log", "2"]).unwrap();
    drop(context);

    assert_eq!(args.verbose, 2);
    assert!(!args.debug);
}

#[test]
fn end_to_end_required_missing() {
    let mut args = LogArgs::default();
    let mut context = ContextBuilder::new("program")
        .container(&mut args)
        .build()
        .unwrap();

    let error = context.parse(&["-debug"]).unwrap_err();
    let message = error.to_string();

    assert_contains!(message, "required");
    assert_contains!(message, "-log, -verbose");
}

#[test]
fn end_to_end_pairs_and_main() {
    let mut pairs: Vec<String> = Vec::default();
    let mut rest: Vec<String> = Vec::default();
    let mut context = ContextBuilder::new("program")
        .add(Param::option(Collection::new(&mut pairs), &["-pairs"]).arity(2))
        .add(Param::main(Collection::new(&mut rest)))
        .build()
        .unwrap();

    context.parse(&["-pairs", "a", "b", "c"]).unwrap();
    drop(context);

    assert_eq!(pairs, vec!["a".to_string(), "b".to_string()]);
    assert_eq!(rest, vec!["c".to_string()]);
}

struct AddArgs {
    interactive: Vec<String>,
}

impl Schema for AddArgs {
    fn describe<'a>(&'a mut self, schema: &mut SchemaBuilder<'a>) {
        let AddArgs { interactive } = self;
        schema.add(Param::option(Collection::new(interactive), &["-i"]));
    }
}

struct CommitArgs {
    message: String,
    amend: bool,
}

impl Schema for CommitArgs {
    fn describe<'a>(&'a mut self, schema: &mut SchemaBuilder<'a>) {
        let CommitArgs { message, amend } = self;
        schema
            .add(Param::option(Scalar::new(message), &["-m", "-message"]))
            .add(Param::option(Switch::new(amend, true), &["-amend"]));
    }
}

#[test]
fn end_to_end_command_alias() {
    let mut add = AddArgs {
        interactive: Vec::default(),
    };
    let mut commit = CommitArgs {
        message: String::default(),
        amend: false,
    };
    let mut context = ContextBuilder::new("program")
        .command("add", &["a"], &mut add)
        .command("commit", &["ci", "cmt"], &mut commit)
        .build()
        .unwrap();

    context.parse(&["a", "-i", "A.java"]).unwrap();

    let selection = context.selection();
    assert_eq!(selection.len(), 1);
    assert_eq!(selection[0].canonical, "add".to_string());
    assert_eq!(selection[0].matched, "a".to_string());

    drop(context);
    assert_eq!(add.interactive, vec!["A.java".to_string()]);
    assert_eq!(commit.message, String::default());
    assert!(!commit.amend);
}

#[rstest]
#[case(vec!["ci", "-m", "fix"], "fix", false)]
#[case(vec!["cmt", "-m", "fix", "-amend"], "fix", true)]
#[case(vec!["commit", "-amend"], "", true)]
fn end_to_end_command_aliases(
    #[case] tokens: Vec<&str>,
    #[case] expected_message: &str,
    #[case] expected_amend: bool,
) {
    let mut add = AddArgs {
        interactive: Vec::default(),
    };
    let mut commit = CommitArgs {
        message: String::default(),
        amend: false,
    };
    let mut context = ContextBuilder::new("program")
        .command("add", &["a"], &mut add)
        .command("commit", &["ci", "cmt"], &mut commit)
        .build()
        .unwrap();

    context.parse(tokens.as_slice()).unwrap();

    let selection = context.selection();
    assert_eq!(selection[0].canonical, "commit".to_string());
    assert_eq!(selection[0].matched, tokens[0].to_string());

    drop(context);
    assert_eq!(commit.message, expected_message.to_string());
    assert_eq!(commit.amend, expected_amend);
}

#[test]
fn end_to_end_nested_sub_command() {
    struct RemoteArgs {
        verbose: bool,
    }

    impl Schema for RemoteArgs {
        fn describe<'a>(&'a mut self, schema: &mut SchemaBuilder<'a>) {
            let RemoteArgs { verbose } = self;
            schema.add(Param::option(Switch::new(verbose, true), &["-v"]));
        }
    }

    struct RemoteAddArgs {
        url: String,
    }

    impl Schema for RemoteAddArgs {
        fn describe<'a>(&'a mut self, schema: &mut SchemaBuilder<'a>) {
            let RemoteAddArgs { url } = self;
            schema.add(Param::option(Scalar::new(url), &["-url"]));
        }
    }

    let mut remote = RemoteArgs { verbose: false };
    let mut remote_add = RemoteAddArgs {
        url: String::default(),
    };
    let mut context = ContextBuilder::new("program")
        .command_with("remote", &[], &mut remote, |sub| {
            sub.command("add", &[], &mut remote_add)
        })
        .build()
        .unwrap();

    context
        .parse(&["remote", "-v", "add", "-url", "git://x"])
        .unwrap();

    let selection = context.selection();
    assert_eq!(selection.len(), 2);
    assert_eq!(selection[0].canonical, "remote".to_string());
    assert_eq!(selection[1].canonical, "add".to_string());

    drop(context);
    assert!(remote.verbose);
    assert_eq!(remote_add.url, "git://x".to_string());
}

#[test]
fn end_to_end_combined_short_flags() {
    let mut a: bool = false;
    let mut b: bool = false;
    let mut c: bool = false;
    let mut context = ContextBuilder::new("program")
        .allow_clusters(true)
        .add(Param::option(Switch::new(&mut a, true), &["-a"]))
        .add(Param::option(Switch::new(&mut b, true), &["-b"]))
        .add(Param::option(Switch::new(&mut c, true), &["-c"]))
        .build()
        .unwrap();

    context.parse(&["-abc"]).unwrap();
    drop(context);

    assert!(a);
    assert!(b);
    assert!(c);
}

#[test]
fn end_to_end_combined_short_with_value() {
    let mut a: bool = false;
    let mut c: bool = false;
    let mut s: String = String::default();
    let mut context = ContextBuilder::new("program")
        .allow_clusters(true)
        .add(Param::option(Switch::new(&mut a, true), &["-a"]))
        .add(Param::option(Switch::new(&mut c, true), &["-c"]))
        .add(Param::option(Scalar::new(&mut s), &["-s"]))
        .build()
        .unwrap();

    context.parse(&["-acs", "value"]).unwrap();
    drop(context);

    assert!(a);
    assert!(c);
    assert_eq!(s, "value".to_string());
}

#[rstest]
#[case("-verb", 3, false)]
#[case("-verbose", 3, false)]
#[case("-d", 0, true)]
fn end_to_end_abbreviations(
    #[case] token: &str,
    #[case] expected_verbose: i32,
    #[case] flag_form: bool,
) {
    let mut args = LogArgs::default();
    let mut context = ContextBuilder::new("program")
        .allow_abbreviations(true)
        .container(&mut args)
        .build()
        .unwrap();

    if flag_form {
        context.parse(&["-log", "0", token]).unwrap();
    } else {
        context.parse(&[token, "3"]).unwrap();
    }
    drop(context);

    assert_eq!(args.verbose, expected_verbose);
    assert_eq!(args.debug, flag_form);
}

#[test]
fn end_to_end_ambiguous_abbreviation() {
    let mut verbose: i32 = 0;
    let mut version: bool = false;
    let mut context = ContextBuilder::new("program")
        .allow_abbreviations(true)
        .add(Param::option(Scalar::new(&mut verbose), &["-verbose"]))
        .add(Param::option(Switch::new(&mut version, true), &["-version"]))
        .build()
        .unwrap();

    let error = context.parse(&["-ver"]).unwrap_err();
    let message = error.to_string();

    assert_contains!(message, "'-ver' is ambiguous");
    assert_contains!(message, "-verbose");
    assert_contains!(message, "-version");
}

#[test]
fn end_to_end_separator_round_trip() {
    // 'FromStr' is inverted by 'Display' for u32, so re-serializing the bound
    // value must reproduce the inline token exactly.
    let raw = "17";
    let mut opt: u32 = 0;
    let mut context = ContextBuilder::new("program")
        .add(Param::option(Scalar::new(&mut opt), &["--opt"]))
        .build()
        .unwrap();

    let token = format!("--opt={raw}");
    context.parse(&[token.as_str()]).unwrap();
    drop(context);

    assert_eq!(opt.to_string(), raw.to_string());
}

#[test]
fn end_to_end_dynamic_accumulation() {
    let mut defines: HashMap<String, String> = HashMap::default();
    let mut context = ContextBuilder::new("program")
        .add(Param::dynamic(DynamicMap::new(&mut defines), &["-D"]))
        .build()
        .unwrap();

    context
        .parse(&["-Dtimeout=30", "-D", "retries=2", "-Dtimeout=60"])
        .unwrap();
    drop(context);

    assert_eq!(
        defines,
        HashMap::from([
            ("timeout".to_string(), "60".to_string()),
            ("retries".to_string(), "2".to_string()),
        ])
    );
}

#[test]
fn end_to_end_duplicate_name_configuration() {
    let mut first: u32 = 0;
    let mut second: u32 = 0;
    let result = ContextBuilder::new("program")
        .add(Param::option(Scalar::new(&mut first), &["-x"]))
        .add(Param::option(Scalar::new(&mut second), &["-x"]))
        .build();

    let message = result.unwrap_err().to_string();
    assert_contains!(message, "the option '-x' is defined 2 times");
}

#[test]
fn end_to_end_alias_collision_configuration() {
    let mut add = AddArgs {
        interactive: Vec::default(),
    };
    let mut commit = CommitArgs {
        message: String::default(),
        amend: false,
    };
    let result = ContextBuilder::new("program")
        .command("add", &["a"], &mut add)
        .command("amend", &["a"], &mut commit)
        .build();

    let message = result.unwrap_err().to_string();
    assert_contains!(message, "'a' is already registered under 'add'");
}

#[test]
fn end_to_end_case_insensitive() {
    let mut args = LogArgs::default();
    let mut context = ContextBuilder::new("program")
        .case_insensitive(true)
        .container(&mut args)
        .build()
        .unwrap();

    context.parse(&["-LOG", "4", "-Debug"]).unwrap();
    drop(context);

    assert_eq!(args.verbose, 4);
    assert!(args.debug);
}

#[test]
fn end_to_end_descriptor_table() {
    let mut args = LogArgs::default();
    let mut hidden: bool = false;
    let context = ContextBuilder::new("program")
        .columns(100)
        .container(&mut args)
        .add(
            Param::option(Switch::new(&mut hidden, true), &["-internal"])
                .hidden()
                .help("Internal switch."),
        )
        .build()
        .unwrap();

    assert_eq!(context.program(), "program");
    assert_eq!(context.columns(), 100);

    let descriptors = context.descriptors();
    assert_eq!(descriptors.len(), 3);
    assert_eq!(
        descriptors[0].names,
        vec!["-log".to_string(), "-verbose".to_string()]
    );
    assert!(descriptors[0].required);
    assert!(!descriptors[0].hidden);
    assert!(descriptors[2].hidden);
    assert_eq!(descriptors[2].description, Some("Internal switch.".to_string()));
}

#[test]
fn end_to_end_reset_and_reparse() {
    let mut args = LogArgs::default();
    let mut context = ContextBuilder::new("program")
        .container(&mut args)
        .build()
        .unwrap();

    context.parse(&["-log", "1"]).unwrap();
    context.reset();
    context.parse(&["-log", "2", "-debug"]).unwrap();
    drop(context);

    assert_eq!(args.verbose, 2);
    assert!(args.debug);
}
