use thiserror::Error;

use crate::curriculum::{AnswerOption, Course, Lesson, Question, QuestionType, Quiz, Resource, ResourceType, Unit};

/// Floor on options per question; removal below this is rejected, not
/// silently allowed.
pub const MIN_OPTIONS: usize = 2;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EditError {
    #[error("{0} index out of range")]
    OutOfRange(&'static str),
    #[error("a question keeps at least {MIN_OPTIONS} options")]
    MinOptions,
}

#[derive(Debug, Clone)]
pub struct EditorDefaults {
    pub unit_title: String,
    pub lesson_title: String,
    pub lesson_duration_minutes: i64,
}

impl Default for EditorDefaults {
    fn default() -> Self {
        EditorDefaults {
            unit_title: "New Unit".to_string(),
            lesson_title: "New Lesson".to_string(),
            lesson_duration_minutes: 30,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ResourceField {
    Type(ResourceType),
    Url(Option<String>),
    Content(Option<String>),
}

/// One structural mutation of a course tree. Ops address entities by
/// position; newly inserted entities carry no id until the backend assigns
/// one on save.
#[derive(Debug, Clone)]
pub enum EditOp {
    AddUnit,
    RemoveUnit { unit: usize },
    MoveUnit { from: usize, to: usize },
    AddLesson { unit: usize },
    RemoveLesson { unit: usize, lesson: usize },
    MoveLesson { unit: usize, from: usize, to: usize },
    AddQuiz { unit: usize, lesson: usize },
    RemoveQuiz { unit: usize, lesson: usize, quiz: usize },
    AddQuestion { unit: usize, lesson: usize, quiz: usize },
    RemoveQuestion { unit: usize, lesson: usize, quiz: usize, question: usize },
    AddOption { unit: usize, lesson: usize, quiz: usize, question: usize },
    RemoveOption { unit: usize, lesson: usize, quiz: usize, question: usize, option: usize },
    SetOptionCorrect { unit: usize, lesson: usize, quiz: usize, question: usize, option: usize },
    AddResource { unit: usize, lesson: usize, resource_type: ResourceType },
    RemoveResource { unit: usize, lesson: usize, resource: usize },
    SetResourceField { unit: usize, lesson: usize, resource: usize, field: ResourceField },
}

/// Apply one op. Ok(true) means the tree changed; Ok(false) is a clamped
/// no-op (move target out of range). On Err the tree is untouched — every
/// op validates its full path before mutating anything.
pub fn apply(course: &mut Course, op: EditOp, defaults: &EditorDefaults) -> Result<bool, EditError> {
    match op {
        EditOp::AddUnit => {
            course.units.push(new_unit(defaults));
            Ok(true)
        }
        EditOp::RemoveUnit { unit } => {
            if unit >= course.units.len() {
                return Err(EditError::OutOfRange("unit"));
            }
            // Drops the unit's lessons, quizzes and resources with it.
            course.units.remove(unit);
            Ok(true)
        }
        EditOp::MoveUnit { from, to } => {
            if from >= course.units.len() {
                return Err(EditError::OutOfRange("unit"));
            }
            Ok(move_element(&mut course.units, from, to))
        }
        EditOp::AddLesson { unit } => {
            let u = unit_mut(course, unit)?;
            u.lessons.push(new_lesson(defaults));
            Ok(true)
        }
        EditOp::RemoveLesson { unit, lesson } => {
            let u = unit_mut(course, unit)?;
            if lesson >= u.lessons.len() {
                return Err(EditError::OutOfRange("lesson"));
            }
            u.lessons.remove(lesson);
            Ok(true)
        }
        EditOp::MoveLesson { unit, from, to } => {
            let u = unit_mut(course, unit)?;
            if from >= u.lessons.len() {
                return Err(EditError::OutOfRange("lesson"));
            }
            Ok(move_element(&mut u.lessons, from, to))
        }
        EditOp::AddQuiz { unit, lesson } => {
            let l = lesson_mut(course, unit, lesson)?;
            l.quizzes.push(Quiz {
                id: None,
                title: "New Quiz".to_string(),
                questions: vec![new_question()],
            });
            Ok(true)
        }
        EditOp::RemoveQuiz { unit, lesson, quiz } => {
            let l = lesson_mut(course, unit, lesson)?;
            if quiz >= l.quizzes.len() {
                return Err(EditError::OutOfRange("quiz"));
            }
            l.quizzes.remove(quiz);
            Ok(true)
        }
        EditOp::AddQuestion { unit, lesson, quiz } => {
            let q = quiz_mut(course, unit, lesson, quiz)?;
            q.questions.push(new_question());
            Ok(true)
        }
        EditOp::RemoveQuestion { unit, lesson, quiz, question } => {
            let q = quiz_mut(course, unit, lesson, quiz)?;
            if question >= q.questions.len() {
                return Err(EditError::OutOfRange("question"));
            }
            q.questions.remove(question);
            Ok(true)
        }
        EditOp::AddOption { unit, lesson, quiz, question } => {
            let q = question_mut(course, unit, lesson, quiz, question)?;
            q.options.push(AnswerOption {
                id: None,
                text: "New Option".to_string(),
                is_correct: false,
            });
            Ok(true)
        }
        EditOp::RemoveOption { unit, lesson, quiz, question, option } => {
            let q = question_mut(course, unit, lesson, quiz, question)?;
            if option >= q.options.len() {
                return Err(EditError::OutOfRange("option"));
            }
            if q.options.len() <= MIN_OPTIONS {
                return Err(EditError::MinOptions);
            }
            q.options.remove(option);
            Ok(true)
        }
        EditOp::SetOptionCorrect { unit, lesson, quiz, question, option } => {
            let q = question_mut(course, unit, lesson, quiz, question)?;
            if option >= q.options.len() {
                return Err(EditError::OutOfRange("option"));
            }
            // Single-answer semantics: exactly one correct option afterward.
            for (i, o) in q.options.iter_mut().enumerate() {
                o.is_correct = i == option;
            }
            Ok(true)
        }
        EditOp::AddResource { unit, lesson, resource_type } => {
            let l = lesson_mut(course, unit, lesson)?;
            l.resources.push(Resource {
                resource_type,
                url: None,
                content: None,
                uploading: false,
            });
            Ok(true)
        }
        EditOp::RemoveResource { unit, lesson, resource } => {
            let l = lesson_mut(course, unit, lesson)?;
            if resource >= l.resources.len() {
                return Err(EditError::OutOfRange("resource"));
            }
            l.resources.remove(resource);
            Ok(true)
        }
        EditOp::SetResourceField { unit, lesson, resource, field } => {
            let l = lesson_mut(course, unit, lesson)?;
            let Some(r) = l.resources.get_mut(resource) else {
                return Err(EditError::OutOfRange("resource"));
            };
            match field {
                // Changing the type keeps any url/content already entered.
                ResourceField::Type(t) => r.resource_type = t,
                ResourceField::Url(u) => r.url = u,
                ResourceField::Content(c) => r.content = c,
            }
            Ok(true)
        }
    }
}

/// After removing unit `removed`, shift the view's expanded-unit indices
/// past it down by one and drop the removed entry.
pub fn reindex_expanded_after_unit_remove(expanded: &mut Vec<usize>, removed: usize) {
    expanded.retain(|&i| i != removed);
    for i in expanded.iter_mut() {
        if *i > removed {
            *i -= 1;
        }
    }
}

fn new_unit(defaults: &EditorDefaults) -> Unit {
    Unit {
        id: None,
        title: defaults.unit_title.clone(),
        description: None,
        lessons: Vec::new(),
    }
}

fn new_lesson(defaults: &EditorDefaults) -> Lesson {
    Lesson {
        id: None,
        title: defaults.lesson_title.clone(),
        content: String::new(),
        duration: defaults.lesson_duration_minutes,
        resources: Vec::new(),
        quizzes: Vec::new(),
        is_completed: false,
        completed_by: Vec::new(),
        completed_at: None,
    }
}

fn new_question() -> Question {
    Question {
        id: None,
        question_text: "New Question".to_string(),
        question_type: QuestionType::MultipleChoice,
        points: 1,
        options: vec![
            AnswerOption { id: None, text: "Option 1".to_string(), is_correct: true },
            AnswerOption { id: None, text: "Option 2".to_string(), is_correct: false },
            AnswerOption { id: None, text: "Option 3".to_string(), is_correct: false },
        ],
    }
}

/// Remove-then-insert move preserving the relative order of everything
/// else. An out-of-range target is a clamped no-op.
fn move_element<T>(items: &mut Vec<T>, from: usize, to: usize) -> bool {
    if from == to || to >= items.len() {
        return false;
    }
    let item = items.remove(from);
    items.insert(to, item);
    true
}

fn unit_mut(course: &mut Course, unit: usize) -> Result<&mut Unit, EditError> {
    course.units.get_mut(unit).ok_or(EditError::OutOfRange("unit"))
}

fn lesson_mut(course: &mut Course, unit: usize, lesson: usize) -> Result<&mut Lesson, EditError> {
    unit_mut(course, unit)?
        .lessons
        .get_mut(lesson)
        .ok_or(EditError::OutOfRange("lesson"))
}

fn quiz_mut(course: &mut Course, unit: usize, lesson: usize, quiz: usize) -> Result<&mut Quiz, EditError> {
    lesson_mut(course, unit, lesson)?
        .quizzes
        .get_mut(quiz)
        .ok_or(EditError::OutOfRange("quiz"))
}

fn question_mut(
    course: &mut Course,
    unit: usize,
    lesson: usize,
    quiz: usize,
    question: usize,
) -> Result<&mut Question, EditError> {
    quiz_mut(course, unit, lesson, quiz)?
        .questions
        .get_mut(question)
        .ok_or(EditError::OutOfRange("question"))
}
