//! Fixed reply templates, one per intent.

use super::intent::IntentCategory;

/// Seed message for every new session.
pub const GREETING: &str = "Hi! I'm your AI career guidance assistant. I can help you with questions about your skill development, career planning, resume improvement, and more. What would you like to know?";

/// Reply recorded when the backend fails. Not reachable through [`generate`].
pub const ERROR_FALLBACK: &str = "I apologize, but I'm having trouble responding right now. Please try again or contact support.";

/// Map an intent to its reply text. Total and deterministic.
pub fn generate(category: IntentCategory) -> &'static str {
    match category {
        IntentCategory::SkillGap => {
            "Based on your profile analysis, you have gaps in advanced React concepts, Node.js development, and cloud architecture. I recommend starting with React hooks and context API, then moving to server-side development. Would you like specific resource recommendations?"
        }
        IntentCategory::Resume => {
            "Your resume readiness score is 75%. Key improvements needed: Add specific metrics to experience sections, include more industry keywords, and highlight technical skills prominently. Focus on quantifiable achievements rather than just job descriptions."
        }
        IntentCategory::CareerJob => {
            "Based on your current skills, you're well-suited for Full Stack Developer, Frontend Developer, or Software Engineer roles. Average salaries range from $70,000-$130,000 depending on experience and location. Consider targeting tech companies, startups, or mid-size firms in your area."
        }
        IntentCategory::LearningPlan => {
            "Your personalized 3-month learning roadmap focuses on: Month 1 - Advanced React (hooks, context, performance), Month 2 - Node.js & APIs, Month 3 - Cloud technologies & deployment. You're currently in Week 1. Would you like me to break down specific weekly goals?"
        }
        IntentCategory::Interview => {
            "For technical interviews, prioritize: Data structures & algorithms (LeetCode practice), system design questions, and behavioral interviews. Practice explaining your projects clearly. Common topics include React concepts, JavaScript fundamentals, and problem-solving approaches. Start with easy problems and gradually increase difficulty."
        }
        IntentCategory::ImpactGoals => {
            "Your career development contributes to SDG-8 (Decent Work & Economic Growth) by improving workforce preparedness, reducing skills gaps, and supporting lifelong learning. Your current employability score is 75%, and completing your learning roadmap will increase this significantly."
        }
        IntentCategory::Help => {
            "I can help you with: 📊 Skill gap analysis, 📚 Learning roadmaps, 💼 Career recommendations, 📄 Resume improvement, 🎯 Interview preparation, and 🌱 SDG impact tracking. What specific aspect of your career development would you like assistance with?"
        }
        IntentCategory::General => {
            "That's an interesting question! I specialize in career development topics like skills assessment, job recommendations, resume optimization, interview preparation, and learning strategies. Could you rephrase your question or let me know what specific career topic you'd like help with?"
        }
    }
}

/// Whether `content` is the backend failure reply.
pub fn is_error_fallback(content: &str) -> bool {
    content == ERROR_FALLBACK
}
