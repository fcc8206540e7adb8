//! Allow-list of shell invocations known to be read-only

use tracing::debug;

/// Programs that only observe state
const READ_ONLY_PROGRAMS: &[&str] = &[
    "ls", "cat", "head", "tail", "wc", "pwd", "echo", "grep", "rg", "find", "which", "tree",
];

/// Git subcommands that only observe state
const READ_ONLY_GIT: &[&str] = &["status", "log", "diff", "show", "branch"];

/// Fragments that disqualify a command outright (redirection, chaining,
/// substitution)
const DISQUALIFYING: &[&str] = &[">", ";", "&&", "||", "`", "$(", "\n", "&"];

/// Arguments that turn an otherwise read-only program into a writer
const MUTATING_ARGS: &[&str] = &["-delete", "-exec", "-execdir", "-ok", "-fprint", "--output"];

/// Git branch flags that modify refs
const MUTATING_GIT_BRANCH_ARGS: &[&str] = &["-d", "-D", "-m", "-M", "-c", "-C", "--delete", "--move", "--copy"];

/// Whether `command` matches the read-only allow-list
///
/// Every pipeline stage must itself be allow-listed; anything that redirects
/// output, chains commands or substitutes subshells never matches.
pub fn is_read_only_command(command: &str) -> bool {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return false;
    }

    if let Some(fragment) = DISQUALIFYING.iter().find(|f| trimmed.contains(**f)) {
        debug!(%command, %fragment, "is_read_only_command: disqualifying fragment");
        return false;
    }

    trimmed.split('|').all(is_read_only_stage)
}

fn is_read_only_stage(stage: &str) -> bool {
    let words: Vec<&str> = stage.split_whitespace().collect();
    let Some((program, args)) = words.split_first() else {
        return false;
    };

    if args.iter().any(|a| MUTATING_ARGS.contains(a)) {
        return false;
    }

    if *program == "git" {
        return match args.split_first() {
            Some((sub, rest)) if READ_ONLY_GIT.contains(sub) => {
                *sub != "branch" || !rest.iter().any(|a| MUTATING_GIT_BRANCH_ARGS.contains(a))
            }
            _ => false,
        };
    }

    READ_ONLY_PROGRAMS.contains(program)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_read_only_commands() {
        for cmd in ["ls -la", "cat Cargo.toml", "git status", "git log --oneline -5", "pwd", "rg TODO src"] {
            assert!(is_read_only_command(cmd), "{cmd} should be read-only");
        }
    }

    #[test]
    fn test_pipelines_need_every_stage_allowed() {
        assert!(is_read_only_command("grep -r fn src | wc -l"));
        assert!(!is_read_only_command("cat list.txt | xargs rm"));
    }

    #[test]
    fn test_redirection_and_chaining_disqualify() {
        assert!(!is_read_only_command("echo hi > out.txt"));
        assert!(!is_read_only_command("cat a >> b"));
        assert!(!is_read_only_command("ls; rm -rf build"));
        assert!(!is_read_only_command("ls && make"));
        assert!(!is_read_only_command("echo $(rm x)"));
        assert!(!is_read_only_command("sleep 10 &"));
    }

    #[test]
    fn test_mutating_arguments_disqualify() {
        assert!(!is_read_only_command("find . -name '*.tmp' -delete"));
        assert!(!is_read_only_command("find . -exec rm {} +"));
        assert!(!is_read_only_command("git branch -D feature"));
        assert!(is_read_only_command("git branch -a"));
    }

    #[test]
    fn test_unknown_programs_are_not_allowed() {
        assert!(!is_read_only_command("make test"));
        assert!(!is_read_only_command("git commit -m wip"));
        assert!(!is_read_only_command("git"));
        assert!(!is_read_only_command("   "));
    }
}
