// src/persona.rs

/// Placeholder substituted with the persona parameter inside templates.
pub const PARAM_PLACEHOLDER: &str = "{{param}}";
const LANGUAGE_PLACEHOLDER: &str = "{{language}}";
const INPUT_PLACEHOLDER: &str = "{{input}}";

/// A value asked for before the chat starts and spliced into the prompt.
#[derive(Debug)]
pub struct PersonaParam {
    /// Shown when asking for the value, e.g. "Year (e.g. 1920, 50 BC)".
    pub label: &'static str,
    pub default: &'static str,
}

/// A guided request a persona offers as a chat command, e.g. `/debug rust`.
/// The body is pasted over several lines and framed by `template`.
#[derive(Debug)]
pub struct Task {
    pub command: &'static str,
    pub summary: &'static str,
    /// Shown above the paste area.
    pub input_hint: &'static str,
    /// `None` means the language has to be given.
    pub default_language: Option<&'static str>,
    template: &'static str,
}

impl Task {
    pub fn render(&self, language: &str, input: &str) -> String {
        self.template
            .replace(LANGUAGE_PLACEHOLDER, language.trim())
            .replace(INPUT_PLACEHOLDER, input)
    }
}

#[derive(Debug)]
pub struct Persona {
    pub id: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    system_prompt: &'static str,
    pub param: Option<PersonaParam>,
    greeting: Option<&'static str>,
    warp_greeting: Option<&'static str>,
    tasks: &'static [Task],
}

impl Persona {
    /// Renders the system prompt, falling back to the parameter default.
    pub fn system_prompt(&self, param: Option<&str>) -> String {
        self.fill(self.system_prompt, param)
    }

    /// Opening message sent on session start, if the persona has one.
    pub fn greeting(&self, param: Option<&str>) -> Option<String> {
        self.greeting.map(|g| self.fill(g, param))
    }

    /// Opening message sent after the parameter changes mid-session.
    pub fn warp_greeting(&self, param: Option<&str>) -> Option<String> {
        self.warp_greeting.map(|g| self.fill(g, param))
    }

    pub fn tasks(&self) -> &'static [Task] {
        self.tasks
    }

    pub fn task(&self, command: &str) -> Option<&'static Task> {
        self.tasks.iter().find(|t| t.command.eq_ignore_ascii_case(command))
    }

    /// Title used above model responses.
    pub fn speaker(&self, param: Option<&str>) -> String {
        match (self.id, self.resolve_param(param)) {
            ("time-travel", Some(year)) => format!("Citizen of {}", year),
            _ => self.name.to_string(),
        }
    }

    pub fn resolve_param<'a>(&'a self, param: Option<&'a str>) -> Option<&'a str> {
        let p = self.param.as_ref()?;
        match param.map(str::trim) {
            Some(v) if !v.is_empty() => Some(v),
            _ => Some(p.default),
        }
    }

    fn fill(&self, template: &str, param: Option<&str>) -> String {
        match self.resolve_param(param) {
            Some(value) => template.replace(PARAM_PLACEHOLDER, value),
            None => template.to_string(),
        }
    }
}

static CODE_TASKS: [Task; 3] = [
    Task {
        command: "debug",
        summary: "Find and fix bugs in pasted code.",
        input_hint: "Paste your broken code below.",
        default_language: None,
        template: "Debug this {{language}} code. For each bug show the wrong line, the corrected line and a one-sentence explanation.\n\n```\n{{input}}\n```",
    },
    Task {
        command: "generate",
        summary: "Turn a description into code.",
        input_hint: "Describe what you want to build.",
        default_language: Some("Python"),
        template: "Write complete, runnable {{language}} code for this request, then explain it briefly:\n\n{{input}}",
    },
    Task {
        command: "rate",
        summary: "Score pasted code and suggest improvements.",
        input_hint: "Paste your code below.",
        default_language: None,
        template: "Rate this {{language}} code out of 10 for readability, correctness, efficiency and style, then list concrete improvements.\n\n```\n{{input}}\n```",
    },
];

static CATALOGUE: [Persona; 5] = [
    Persona {
        id: "code-helper",
        name: "Code Helper",
        description: "Debug, generate and review code",
        icon: "⚡",
        system_prompt: "You are Code Helper, a senior software engineer pairing with the user.\n\
            When given broken code, identify each bug, show the wrong line, the corrected line and a one-sentence explanation.\n\
            When asked to write code, produce complete, runnable code in the requested language (Python if none is given) followed by a short explanation.\n\
            When asked to rate code, score readability, correctness, efficiency and style out of 10 and list concrete improvements.\n\
            Format answers in Markdown with fenced code blocks.",
        param: None,
        greeting: None,
        warp_greeting: None,
        tasks: &CODE_TASKS,
    },
    Persona {
        id: "study-buddy",
        name: "Study Buddy",
        description: "Explain topics and quiz you on them",
        icon: "📚",
        system_prompt: "You are Study Buddy, a patient tutor.\n\
            Explain concepts step by step using simple language and a concrete example.\n\
            After each explanation, offer one short practice question and wait for the user's answer before revealing the solution.\n\
            If the user seems confused, try a different analogy instead of repeating yourself.",
        param: None,
        greeting: None,
        warp_greeting: None,
        tasks: &[],
    },
    Persona {
        id: "translator",
        name: "Translator",
        description: "Translate text into another language",
        icon: "🌐",
        system_prompt: "You are a professional translator.\n\
            Translate every message the user sends into {{param}}.\n\
            Reply with the translation only. If a phrase is idiomatic, add a one-line note after the translation explaining the choice.\n\
            If the message is already in {{param}}, correct any mistakes and show the corrected text.",
        param: Some(PersonaParam {
            label: "Target language",
            default: "English",
        }),
        greeting: None,
        warp_greeting: None,
        tasks: &[],
    },
    Persona {
        id: "time-travel",
        name: "Time Travel Chat",
        description: "Talk to someone living in another year",
        icon: "⏳",
        system_prompt: "You are a person living in the year {{param}} and you believe it is the present.\n\
            Use only the knowledge, vocabulary, beliefs and customs that exist in {{param}}.\n\
            Never mention events, people or technology from after {{param}}. If the user mentions something that does not exist yet, react with confusion, doubt or curiosity.\n\
            Never say or imply that you are an AI, a model or a program, and never break character.\n\
            Match the tone of the era: myth and omen before 1500, formal fascination with machines from 1700 to 1900, trust in newspapers, radio and television from 1950 to 2000, confident talk of speculative technology after 2050.",
        param: Some(PersonaParam {
            label: "Year (e.g. 1920, 50 BC)",
            default: "1920",
        }),
        greeting: Some("Hello! What is happening in {{param}}?"),
        warp_greeting: Some("Where am I? What year is this?"),
        tasks: &[],
    },
    Persona {
        id: "story-teller",
        name: "Story Teller",
        description: "Co-write a story one scene at a time",
        icon: "📖",
        system_prompt: "You are Story Teller, a collaborative fiction writer.\n\
            Continue the story from the user's input with one vivid scene of at most three paragraphs.\n\
            End each scene with two numbered choices for what happens next.\n\
            Keep characters, names and facts consistent with earlier scenes.",
        param: None,
        greeting: None,
        warp_greeting: None,
        tasks: &[],
    },
];

/// Built-in personas in menu order.
pub fn catalogue() -> &'static [Persona] {
    &CATALOGUE
}

/// Case-insensitive lookup by id.
pub fn find(id: &str) -> Option<&'static Persona> {
    CATALOGUE.iter().find(|p| p.id.eq_ignore_ascii_case(id.trim()))
}

/// Maps a 1-based menu choice onto the catalogue.
pub fn by_menu_number(choice: &str) -> Option<&'static Persona> {
    let n: usize = choice.trim().parse().ok()?;
    n.checked_sub(1).and_then(|i| CATALOGUE.get(i))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<_> = catalogue().iter().map(|p| p.id).collect();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), catalogue().len());
    }

    #[test]
    fn find_is_case_insensitive() {
        assert_eq!(find("Study-Buddy").map(|p| p.name), Some("Study Buddy"));
        assert!(find("nobody").is_none());
    }

    #[test]
    fn menu_numbers_are_one_based() {
        assert_eq!(by_menu_number("1").map(|p| p.id), Some("code-helper"));
        assert!(by_menu_number("0").is_none());
        assert!(by_menu_number("99").is_none());
        assert!(by_menu_number("abc").is_none());
    }

    #[test]
    fn param_is_substituted_everywhere() {
        let translator = find("translator").unwrap();
        let prompt = translator.system_prompt(Some("French"));
        assert!(prompt.contains("into French"));
        assert!(!prompt.contains(PARAM_PLACEHOLDER));
    }

    #[test]
    fn blank_param_falls_back_to_default() {
        let time_travel = find("time-travel").unwrap();
        assert!(time_travel.system_prompt(Some("  ")).contains("year 1920"));
        assert_eq!(
            time_travel.greeting(Some("1850")).as_deref(),
            Some("Hello! What is happening in 1850?")
        );
        assert_eq!(time_travel.speaker(Some("1850")), "Citizen of 1850");
    }

    #[test]
    fn personas_without_param_ignore_it() {
        let helper = find("code-helper").unwrap();
        assert_eq!(helper.resolve_param(Some("x")), None);
        assert!(helper.greeting(None).is_none());
        assert_eq!(helper.speaker(None), "Code Helper");
    }

    #[test]
    fn warp_asks_where_the_traveller_landed() {
        let time_travel = find("time-travel").unwrap();
        assert_eq!(
            time_travel.warp_greeting(Some("3000")).as_deref(),
            Some("Where am I? What year is this?")
        );
        assert_ne!(time_travel.warp_greeting(None), time_travel.greeting(None));
        assert!(find("translator").unwrap().warp_greeting(None).is_none());
    }

    #[test]
    fn code_helper_tasks_frame_the_pasted_code() {
        let helper = find("code-helper").unwrap();
        let names: Vec<_> = helper.tasks().iter().map(|t| t.command).collect();
        assert_eq!(names, vec!["debug", "generate", "rate"]);

        let debug = helper.task("DEBUG").unwrap();
        assert_eq!(debug.default_language, None);
        let rendered = debug.render(" Rust ", "fn main() {\n    let x = ;\n}");
        assert!(rendered.starts_with("Debug this Rust code."));
        assert!(rendered.contains("```\nfn main() {\n    let x = ;\n}\n```"));

        assert_eq!(helper.task("generate").unwrap().default_language, Some("Python"));
        assert!(find("study-buddy").unwrap().task("debug").is_none());
    }
}
