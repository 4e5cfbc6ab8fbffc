use anyhow::Error;
use pretty_assertions::assert_eq;

use workbench::run_source;
use workbench_mp0::MachineConfig;

/// Interface for testing a program through the whole pipeline, down to the machine.
#[derive(Debug)]
pub struct TestInterface {
    result: Result<i32, Error>,
    stdout: String,
}

/// A program that stopped normally.
#[derive(Debug)]
pub struct TestInterfaceSuccessful {
    code: i32,
    stdout: String,
}

impl TestInterface {
    /// Run `source`, guessing its language, with an empty stdin.
    pub fn run(source: &str) -> Self {
        TestInterface::run_with_input(source, None, "")
    }

    pub fn run_with_input(source: &str, lang: Option<&str>, stdin: &str) -> Self {
        super::setup();
        let mut stdout = Vec::new();
        let config = MachineConfig::default();
        let result = run_source(source, lang, config, stdin.as_bytes(), &mut stdout);
        TestInterface {
            result,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
        }
    }

    /// Check that the program stopped normally.
    pub fn success(self) -> TestInterfaceSuccessful {
        match self.result {
            Ok(code) => TestInterfaceSuccessful {
                code,
                stdout: self.stdout,
            },
            Err(e) => panic!("The program failed: {:?}\nstdout: {}", e, self.stdout),
        }
    }

    /// Check that the program failed, with an error whose chain mentions `message`.
    pub fn failure(self, message: &str) -> String {
        match self.result {
            Ok(code) => panic!("The program exited with {} but it should fail", code),
            Err(e) => {
                let chain = format!("{:#}", e);
                assert!(
                    chain.contains(message),
                    "The error {:?} does not mention {:?}",
                    chain,
                    message
                );
                self.stdout
            }
        }
    }
}

impl TestInterfaceSuccessful {
    pub fn exit_code(self, code: i32) -> Self {
        assert_eq!(self.code, code, "Wrong exit code");
        self
    }

    pub fn stdout(self, stdout: &str) -> Self {
        assert_eq!(self.stdout, stdout, "Wrong output");
        self
    }
}
