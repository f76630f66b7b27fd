//! System prompt text: persona, goals, constraints, the command list and the
//! response format the output parser expects.

use orchestra_core::command::{FINISH_COMMAND, HUMAN_INPUT_COMMAND};
use orchestra_core::tool::ToolRegistry;
use std::fmt::Write;

const PROMPT_START: &str = "Please always follow the response format specified at the end of this message, including your first response.
Play to your strengths as an LLM and pursue simple strategies with no legal complications.
Use your best judgement on when to make decisions independently or seek user assistance.
If you have completed all your tasks, make sure to use the \"finish\" command.";

const HUMAN_INPUT_DESCRIPTION: &str = "You can ask a human for additional input or guidance when you think you got stuck or you are not sure what to do next. The input should be a question for the human, along with necessary context.";

const FINISH_DESCRIPTION: &str = "use this to signal that you have finished all your objectives";

const RESOURCES: &[&str] = &[
    "Internet access for searches and information gathering.",
    "Long Term memory management.",
    "File output.",
];

const PERFORMANCE_EVALUATION: &[&str] = &[
    "Continuously review and analyze your actions to ensure you are performing to the best of your abilities.",
    "Constructively self-criticize your big-picture behavior constantly.",
    "Reflect on past decisions and strategies to refine your approach.",
    "Every command has a cost, so be smart and efficient. Aim to complete tasks in the least number of steps.",
];

const RESPONSE_FORMAT: &str = r#"{
    "thoughts": {
        "text": "thought",
        "reasoning": "reasoning",
        "plan": "- short bulleted\n- list that conveys\n- long-term plan",
        "criticism": "constructive self-criticism",
        "speak": "thoughts summary to say to user"
    },
    "command": {
        "name": "command name",
        "args": {
            "arg name": "value"
        }
    }
}"#;

/// Who the agent says it is.
#[derive(Debug, Clone)]
pub struct Persona {
    pub name: String,
    pub role: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: "MetaAgent".into(),
            role: "an Assistant to help user achieve their goals".into(),
        }
    }
}

/// Render everything after the goals: constraints, numbered commands,
/// resources, evaluation criteria and the response format.
///
/// Computed once per agent since it only depends on the tool set.
pub fn instructions(tools: &ToolRegistry, human_in_the_loop: bool) -> String {
    let mut out = String::new();

    let assistance = if human_in_the_loop {
        "Only ask the human for help with the \"request-human-input\" command, and only when you are stuck"
    } else {
        "No user assistance"
    };
    let constraints = [
        "~4000 word limit for short term memory. Your short term memory is short, so immediately save important information to files.",
        "If you are unsure how you previously did something or want to recall past events, thinking about similar events will help you remember.",
        assistance,
        "Exclusively use the commands listed in double quotes e.g. \"command name\"",
    ];
    push_numbered(&mut out, "Constraints", constraints.iter().copied());

    let mut commands: Vec<String> = tools
        .iter()
        .map(|t| {
            format!(
                "{}: {}, args json schema: {}",
                t.name(),
                t.description(),
                t.args_shape()
            )
        })
        .collect();
    if human_in_the_loop {
        commands.push(format!(
            "{HUMAN_INPUT_COMMAND}: {HUMAN_INPUT_DESCRIPTION}, args json schema: {{\"input\":\"string\"}}"
        ));
    }
    commands.push(format!(
        "{FINISH_COMMAND}: {FINISH_DESCRIPTION}, args: \"response\": \"final response to let people know you have finished your objectives\""
    ));
    push_numbered(&mut out, "Commands", commands.iter().map(String::as_str));

    push_numbered(&mut out, "Resources", RESOURCES.iter().copied());
    push_numbered(
        &mut out,
        "Performance Evaluation",
        PERFORMANCE_EVALUATION.iter().copied(),
    );

    out.push_str("You should only respond in JSON format as described below\nResponse Format:\n");
    out.push_str(RESPONSE_FORMAT);
    out.push_str("\nEnsure the response can be parsed as JSON");
    out
}

/// The full first system message for a run.
pub fn system_prompt(persona: &Persona, goals: &[String], instructions: &str) -> String {
    let mut prompt = format!(
        "You are {}, {}\n{PROMPT_START}\n\nGOALS:\n\n",
        persona.name, persona.role
    );
    for (idx, goal) in goals.iter().enumerate() {
        let _ = writeln!(prompt, "{}. {goal}", idx + 1);
    }
    prompt.push_str("\n\n");
    prompt.push_str(instructions);
    prompt
}

fn push_numbered<'a>(out: &mut String, title: &str, items: impl Iterator<Item = &'a str>) {
    let _ = writeln!(out, "{title}:");
    for (idx, item) in items.enumerate() {
        let _ = writeln!(out, "{}. {item}", idx + 1);
    }
    out.push('\n');
}
