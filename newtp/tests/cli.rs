//! CLI based tests
use std::process::ExitCode;

use newtp::main as newtp_main;

use rusty_fork::rusty_fork_test;

#[test]
fn show_config_files() {
    assert_eq!(newtp_main(["newtp", "--config-files"]), ExitCode::SUCCESS);
}

#[test]
fn bad_option() {
    assert_eq!(
        newtp_main(["newtp", "--this-ridiculous-option-does-not-exist"]),
        ExitCode::FAILURE
    );
}

#[test]
fn no_command() {
    assert_eq!(newtp_main(["newtp"]), ExitCode::FAILURE);
}

#[test]
fn bad_config_value() {
    assert_eq!(
        newtp_main(["newtp", "--page-size", "12", "ls"]),
        ExitCode::FAILURE
    );
}

rusty_fork_test! {

#[test]
fn duplicate_share_names() {
    assert_eq!(
        newtp_main(["newtp", "serve", "-p", "0", "/tmp=a", "--rw", "/var/tmp=a"]),
        ExitCode::FAILURE
    );
}

#[test]
fn connection_refused() {
    // port 1 is privileged and nothing should be listening there
    assert_eq!(
        newtp_main(["newtp", "-s", "127.0.0.1", "-p", "1", "ls"]),
        ExitCode::FAILURE
    );
}

}
