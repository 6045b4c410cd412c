use super::LanguageProfile;
use std::collections::HashMap;

const DEFAULT_IMAGE: &str = "codecaramel_compiler_default";
const JVM_PHP_IMAGE: &str = "codecaramel_compiler_jvm_php";
const SWIFT_IMAGE: &str = "codecaramel_compiler_swift";

pub(super) fn profiles() -> HashMap<String, LanguageProfile> {
    let c_build: &[&[&str]] = &[&["gcc", "-o", "main", "main.c"]];

    [
        ("Gcc", LanguageProfile::new(DEFAULT_IMAGE, "main.c", c_build, &["./main"])),
        // The default image only ships gcc
        ("Clang", LanguageProfile::new(DEFAULT_IMAGE, "main.c", c_build, &["./main"])),
        (
            "CPP",
            LanguageProfile::new(
                DEFAULT_IMAGE,
                "main.cpp",
                &[&["g++", "-o", "main", "main.cpp"]],
                &["./main"],
            ),
        ),
        ("Ruby", LanguageProfile::new(DEFAULT_IMAGE, "main.rb", &[], &["ruby", "main.rb"])),
        ("Python3", LanguageProfile::new(DEFAULT_IMAGE, "main.py", &[], &["python", "main.py"])),
        ("Golang", LanguageProfile::new(DEFAULT_IMAGE, "main.go", &[], &["go", "run", "main.go"])),
        ("Nodejs", LanguageProfile::new(DEFAULT_IMAGE, "main.js", &[], &["nodejs", "main.js"])),
        ("Perl", LanguageProfile::new(DEFAULT_IMAGE, "main.pl", &[], &["perl", "main.pl"])),
        ("Bash", LanguageProfile::new(DEFAULT_IMAGE, "main.sh", &[], &["bash", "main.sh"])),
        ("Lua", LanguageProfile::new(DEFAULT_IMAGE, "main.lua", &[], &["lua5.3", "main.lua"])),
        ("Haskell", LanguageProfile::new(DEFAULT_IMAGE, "main.hs", &[], &["runghc", "main.hs"])),
        (
            "Java",
            LanguageProfile::new(
                JVM_PHP_IMAGE,
                "Main.java",
                &[&["javac", "Main.java"]],
                &["java", "Main"],
            ),
        ),
        (
            "Scala",
            LanguageProfile::new(
                JVM_PHP_IMAGE,
                "Main.scala",
                &[&["scalac", "Main.scala"]],
                &["scala", "Main"],
            ),
        ),
        ("PHP", LanguageProfile::new(JVM_PHP_IMAGE, "main.php", &[], &["php", "main.php"])),
        ("Swift", LanguageProfile::new(SWIFT_IMAGE, "main.swift", &[], &["swift", "main.swift"])),
    ]
    .into_iter()
    .map(|(name, profile)| (name.to_string(), profile))
    .collect()
}
