// src/exec/return_codes.rs

use crate::jobs::JobResult;

/// Describe an `ansible-playbook` exit code.
///
/// Returns `None` for codes ansible does not document.
pub fn describe_return_code(rc: i32) -> Option<&'static str> {
    let msg = match rc {
        JobResult::LAUNCH_FAILURE_RC => "The playbook process could not be launched.",
        0 => "The command ran successfully, without any task failures or internal errors.",
        1 => "There was a fatal error or exception during execution.",
        2 => "One or more hosts had a task failure.",
        3 | 4 => "Hosts unreachable",
        5 => "Error with the options provided to the command",
        6 => "Command line args are not UTF-8 encoded",
        8 => "A condition called RUN_FAILED_BREAK_PLAY occurred within Task Queue Manager",
        99 => "Ansible received a keyboard interrupt (SIGINT) while running the playbook",
        143 => "Ansible received a kill signal during the playbook run",
        250 => "Unexpected exception, often due to a bug in a module or jinja templating errors",
        255 => "Unknown error, per TQM",
        _ => return None,
    };
    Some(msg)
}
