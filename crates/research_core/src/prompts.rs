//! crates/research_core/src/prompts.rs
//!
//! Natural-language prompts sent to the text-generation service.

use crate::domain::{Complexity, Language};
use crate::outline::Subsection;

/// Number of trailing characters of earlier pages repeated as continuation context.
pub const CONTEXT_TAIL_CHARS: usize = 1000;

fn complexity_description(complexity: Complexity, language: Language) -> &'static str {
    match (language, complexity) {
        (Language::En, Complexity::Basic) => "suitable for undergraduate level research",
        (Language::En, Complexity::Medium) => {
            "suitable for graduate level research with moderate depth"
        }
        (Language::En, Complexity::Advanced) => {
            "suitable for doctoral level research with significant depth and complexity"
        }
        (Language::Ar, Complexity::Basic) => "مناسب لبحث في مرحلة البكالوريوس",
        (Language::Ar, Complexity::Medium) => "مناسب لبحث في مرحلة الماجستير وذو تعقيد متوسط",
        (Language::Ar, Complexity::Advanced) => "مناسب لبحث في مرحلة الدكتوراه وذو تعقيد عالٍ",
    }
}

pub fn outline_prompt(
    topic: &str,
    complexity: Complexity,
    language: Language,
    total_pages: u32,
) -> String {
    let depth = complexity_description(complexity, language);
    match language {
        Language::En => format!(
            r#"Create a detailed academic research outline for the topic: "{topic}"

The outline should be {depth}.
The research paper should be exactly {total_pages} pages in length.

Format the outline as a hierarchical structure with:
1. A clear thesis statement
2. 3-5 research questions
3. Main sections (Introduction, Literature Review, Methodology, Results, Discussion, Conclusion)
4. Subsections for each main section (at least 3 per section)
5. Key points to address in each subsection (at least 3 per subsection)
6. Page count for each section and subsection, ensuring the total adds up to {total_pages} pages

For the methodology section, include research methods appropriate to the topic.

Respond with a single JSON object using this schema:
{{
    "title": "Research Title",
    "thesis_statement": "The main argument or hypothesis",
    "research_questions": ["Question 1", "Question 2"],
    "total_pages": {total_pages},
    "sections": [
        {{
            "title": "Section Title",
            "pages": 2,
            "page_range": {{"start": 3, "end": 4}},
            "subsections": [
                {{
                    "title": "Subsection Title",
                    "pages": 1,
                    "key_points": ["Point 1", "Point 2", "Point 3"]
                }}
            ]
        }}
    ]
}}

Ensure the JSON is valid and properly formatted."#
        ),
        Language::Ar => format!(
            r#"أنشئ مخططًا تفصيليًا لورقة بحث أكاديمية حول الموضوع: "{topic}"

يجب أن يكون المخطط {depth}.
يجب أن يكون طول البحث {total_pages} صفحات.

صِغ المخطط كبنية هرمية تحتوي على:
1. عنوان واضح للبحث
2. بيان الأطروحة (الفكرة أو الحجة الرئيسية)
3. من 3 إلى 5 أسئلة بحث
4. أقسام رئيسية (المقدمة، مراجعة الأدبيات، المنهجية، النتائج، المناقشة، الخاتمة)
5. 3 أقسام فرعية على الأقل لكل قسم رئيسي
6. 3 نقاط رئيسية على الأقل لكل قسم فرعي
7. عدد الصفحات لكل قسم وقسم فرعي، بحيث يساوي المجموع {total_pages} صفحات

أجب بكائن JSON واحد بالهيكل التالي (المفاتيح بالإنجليزية والقيم بالعربية):
{{
    "title": "عنوان البحث",
    "thesis_statement": "بيان الأطروحة",
    "research_questions": ["سؤال 1", "سؤال 2"],
    "total_pages": {total_pages},
    "sections": [
        {{
            "title": "عنوان القسم",
            "pages": 2,
            "page_range": {{"start": 3, "end": 4}},
            "subsections": [
                {{
                    "title": "عنوان القسم الفرعي",
                    "pages": 1,
                    "key_points": ["نقطة 1", "نقطة 2", "نقطة 3"]
                }}
            ]
        }}
    ]
}}

تأكد من أن JSON صالح ومنسق بشكل صحيح."#
        ),
    }
}

/// Everything a content prompt needs to know about the section being written.
#[derive(Debug, Clone)]
pub struct SectionBrief<'a> {
    pub paper_title: &'a str,
    pub thesis: &'a str,
    pub section_title: &'a str,
    pub subsections: &'a [Subsection],
    /// Subsection titles the caller wants covered; empty means all of them.
    pub focus: &'a [String],
    pub citation_style: &'a str,
    pub language: Language,
}

/// Where a single page sits within its section and the final document.
#[derive(Debug, Clone, Copy)]
pub struct PagePosition {
    pub page_in_section: u32,
    pub pages_in_section: u32,
    pub document_page: u32,
}

fn subsection_outline(brief: &SectionBrief<'_>) -> String {
    let mut text = String::new();
    for subsection in brief.subsections {
        if !brief.focus.is_empty() && !brief.focus.iter().any(|f| f.trim() == subsection.title.trim()) {
            continue;
        }
        text.push_str(&format!("- {}\n", subsection.title));
        for point in &subsection.key_points {
            text.push_str(&format!("  - {}\n", point));
        }
    }
    for requested in brief.focus {
        if !brief.subsections.iter().any(|s| s.title.trim() == requested.trim()) {
            text.push_str(&format!("- {}\n", requested));
        }
    }
    text
}

/// Returns at most the last `CONTEXT_TAIL_CHARS` characters of `text`.
pub fn context_tail(text: &str) -> &str {
    let count = text.chars().count();
    if count <= CONTEXT_TAIL_CHARS {
        return text;
    }
    let skip = count - CONTEXT_TAIL_CHARS;
    match text.char_indices().nth(skip) {
        Some((offset, _)) => &text[offset..],
        None => text,
    }
}

fn json_schema_hint(brief: &SectionBrief<'_>, page: Option<u32>) -> String {
    let page_line = page
        .map(|n| format!(",\n    \"page_number\": {n}"))
        .unwrap_or_default();
    let (content_hint, citation_hint, source_hint) = match brief.language {
        Language::En => (
            format!("The content in markdown with citations in {} format", brief.citation_style),
            format!("Full citation text in {} format", brief.citation_style),
            "journal/book/website",
        ),
        Language::Ar => (
            format!("المحتوى بتنسيق markdown مع المراجع بتنسيق {}", brief.citation_style),
            format!("نص المرجع بتنسيق {}", brief.citation_style),
            "نوع المصدر",
        ),
    };
    format!(
        r#"{{
    "section_title": "{title}",
    "content": "{content_hint}",
    "citations": [
        {{"id": "citation1", "text": "{citation_hint}", "source_type": "{source_hint}"}}
    ]{page_line}
}}"#,
        title = brief.section_title,
    )
}

/// Prompt for a whole section in one call.
pub fn section_prompt(brief: &SectionBrief<'_>, target_words: u32) -> String {
    let subsections = subsection_outline(brief);
    let schema = json_schema_hint(brief, None);
    let style = brief.citation_style;
    match brief.language {
        Language::En => format!(
            r#"Write the "{section}" section of a research paper titled "{title}".

Thesis statement: {thesis}

The section should cover the following subsections and key points:
{subsections}
Requirements:
1. Write in a formal academic style appropriate for scholarly publication
2. Include citations using {style} format
3. Use appropriate academic terminology
4. Write approximately {target_words} words
5. Write the content in markdown, using subheadings for the subsections

Respond with a single JSON object using this schema:
{schema}

Ensure the JSON is valid and properly formatted."#,
            section = brief.section_title,
            title = brief.paper_title,
            thesis = brief.thesis,
        ),
        Language::Ar => format!(
            r#"اكتب قسم "{section}" في ورقة بحثية بعنوان "{title}".

بيان الأطروحة: {thesis}

يجب أن يغطي القسم الأقسام الفرعية والنقاط التالية:
{subsections}
المتطلبات:
1. اكتب بأسلوب أكاديمي رسمي
2. استخدم تنسيق {style} للمراجع
3. اكتب حوالي {target_words} كلمة
4. اكتب المحتوى بتنسيق markdown مع عناوين فرعية للأقسام الفرعية

أجب بكائن JSON واحد بالهيكل التالي:
{schema}

تأكد من أن JSON صالح ومنسق بشكل صحيح."#,
            section = brief.section_title,
            title = brief.paper_title,
            thesis = brief.thesis,
        ),
    }
}

/// Prompt for one page of a section, optionally continuing earlier pages.
pub fn page_prompt(
    brief: &SectionBrief<'_>,
    position: PagePosition,
    target_words: u32,
    previous_content: &str,
) -> String {
    let subsections = subsection_outline(brief);
    let schema = json_schema_hint(brief, Some(position.page_in_section));
    let style = brief.citation_style;
    let PagePosition {
        page_in_section: page,
        pages_in_section: pages,
        document_page,
    } = position;
    let tail = context_tail(previous_content.trim());

    match brief.language {
        Language::En => {
            let context = if tail.is_empty() {
                String::new()
            } else {
                format!(
                    "Previously generated content for this section (most recent part):\n...{tail}\n\nContinue from where the previous content left off, maintaining consistency.\n\n"
                )
            };
            format!(
                r#"Generate academic content for page {page} of {pages} of the "{section}" section in a research paper titled "{title}".

Thesis statement: {thesis}

{context}The section should cover the following subsections and key points:
{subsections}
Requirements:
1. Write in a formal academic style appropriate for scholarly publication
2. Include at least 1-2 citations using {style} format
3. Ensure logical flow with previous content
4. Use appropriate academic terminology
5. Write approximately {target_words} words for this page
6. This is page {document_page} in the final document
7. If this is not the first page, continue naturally from the previous content
8. Write the content in markdown

Respond with a single JSON object using this schema:
{schema}

Ensure the JSON is valid and properly formatted."#,
                section = brief.section_title,
                title = brief.paper_title,
                thesis = brief.thesis,
            )
        }
        Language::Ar => {
            let context = if tail.is_empty() {
                String::new()
            } else {
                format!(
                    "المحتوى السابق المولد لهذا القسم (الجزء الأخير):\n...{tail}\n\nاستمر من حيث انتهى المحتوى السابق، مع الحفاظ على الاتساق.\n\n"
                )
            };
            format!(
                r#"قم بإنشاء محتوى أكاديمي للصفحة {page} من {pages} من قسم "{section}" في ورقة بحثية بعنوان "{title}".

بيان الأطروحة: {thesis}

{context}يجب أن يغطي القسم النقاط الفرعية التالية:
{subsections}
المتطلبات:
1. اكتب حوالي {target_words} كلمة لهذه الصفحة
2. قم بتضمين 1-2 اقتباسات على الأقل
3. استخدم تنسيق {style} للمراجع
4. اكتب بأسلوب أكاديمي رسمي
5. قم بتنظيم المحتوى في فقرات واضحة
6. هذه هي الصفحة {document_page} في البحث النهائي
7. إذا لم تكن هذه الصفحة الأولى، استمر بشكل طبيعي من المحتوى السابق
8. اكتب المحتوى بتنسيق markdown

أجب بكائن JSON واحد بالهيكل التالي:
{schema}

تأكد من أن JSON صالح ومنسق بشكل صحيح."#,
                section = brief.section_title,
                title = brief.paper_title,
                thesis = brief.thesis,
            )
        }
    }
}
