//! Playbook rendering: one play with an ordered task list, one module
//! invocation per provisioning step.
//!
//! Free-form values (urls, repository lines, probe commands) are emitted
//! inside double quotes; spec validation rejects quotes and newlines in
//! them, so no escaping happens here.

use crate::spec::{Step, ValidatedPlan};

pub fn render_playbook(plan: &ValidatedPlan) -> String {
    let mut out = String::new();

    out.push_str("---\n");
    out.push_str(&format!("- hosts: {}\n", plan.hosts));
    out.push_str(&format!("  remote_user: {}\n", plan.remote_user));
    out.push_str(&format!("  become: {}\n", plan.escalate));
    out.push_str("  tasks:\n");

    for step in &plan.steps {
        out.push_str(&format!("\n    - name: {}\n", step.title()));
        render_task(&mut out, step);
    }

    out
}

fn render_task(out: &mut String, step: &Step) {
    match step {
        Step::AptUpdate => {
            out.push_str("      apt:\n");
            out.push_str("        update_cache: yes\n");
        }
        Step::AptInstall { packages } => {
            out.push_str("      apt:\n");
            out.push_str("        pkg:\n");
            for pkg in packages {
                out.push_str(&format!("          - {}\n", pkg));
            }
            out.push_str("        state: present\n");
        }
        Step::AptKey { url } => {
            out.push_str("      apt_key:\n");
            out.push_str(&format!("        url: \"{}\"\n", url));
            out.push_str("        state: present\n");
        }
        Step::AptRepository { repo } => {
            out.push_str("      apt_repository:\n");
            out.push_str(&format!("        repo: \"{}\"\n", repo));
            out.push_str("        state: present\n");
        }
        Step::PipInstall { packages } => {
            out.push_str("      pip:\n");
            out.push_str("        name:\n");
            for pkg in packages {
                out.push_str(&format!("          - {}\n", pkg));
            }
        }
        Step::Group { name } => {
            out.push_str("      group:\n");
            out.push_str(&format!("        name: {}\n", name));
            out.push_str("        state: present\n");
        }
        Step::UserGroup { user, group } => {
            out.push_str("      user:\n");
            out.push_str(&format!("        name: {}\n", user));
            out.push_str(&format!("        groups: {}\n", group));
            out.push_str("        append: yes\n");
        }
        Step::Service { name } => {
            out.push_str("      service:\n");
            out.push_str(&format!("        name: {}\n", name));
            out.push_str("        state: started\n");
        }
        Step::Pause { seconds } => {
            out.push_str("      pause:\n");
            out.push_str(&format!("        seconds: {}\n", seconds));
        }
        Step::WaitFor {
            command,
            retries,
            delay_secs,
        } => {
            out.push_str(&format!("      shell: \"{}\"\n", command));
            out.push_str("      register: probe\n");
            out.push_str("      until: probe.rc == 0\n");
            out.push_str(&format!("      retries: {}\n", retries));
            out.push_str(&format!("      delay: {}\n", delay_secs));
        }
    }
}
