use clap::ValueEnum;
use std::collections::HashSet;
use std::path::Path;
use tracing::info;

use crate::parser::QuestionRecord;
use crate::utils::{QpError, QpResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    Text,
    Html,
    Json,
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Html => "html",
            ExportFormat::Json => "json",
        }
    }
}

/// 解析题目选择，如 "1-3,7"。题号从 1 开始，保持书写顺序并去重；
/// 空选择表示全部。
pub fn parse_selection(spec: Option<&str>, total: usize) -> QpResult<Vec<usize>> {
    let spec = spec.map(str::trim).unwrap_or_default();
    if spec.is_empty() {
        return Ok((1..=total).collect());
    }

    let number = |s: &str| -> QpResult<usize> {
        let n: usize = s
            .trim()
            .parse()
            .map_err(|_| QpError::Parse(format!("无效的题号: {:?}", s.trim())))?;
        if n == 0 || n > total {
            return Err(QpError::Parse(format!("题号 {} 超出范围 1..={}", n, total)));
        }
        Ok(n)
    };

    let mut seen = HashSet::new();
    let mut picked = Vec::new();
    for part in spec.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let range = match part.split_once('-') {
            Some((start, end)) => {
                let (start, end) = (number(start)?, number(end)?);
                if start > end {
                    return Err(QpError::Parse(format!("无效的范围: {}", part)));
                }
                start..=end
            }
            None => {
                let n = number(part)?;
                n..=n
            }
        };
        for n in range {
            if seen.insert(n) {
                picked.push(n);
            }
        }
    }
    Ok(picked)
}

/// 按选择取出题目，并按导出顺序从 1 重新编号
pub fn select<'a>(
    questions: &'a [QuestionRecord],
    spec: Option<&str>,
) -> QpResult<Vec<(usize, &'a QuestionRecord)>> {
    Ok(parse_selection(spec, questions.len())?
        .into_iter()
        .enumerate()
        .map(|(i, n)| (i + 1, &questions[n - 1]))
        .collect())
}

pub fn render(format: ExportFormat, selected: &[(usize, &QuestionRecord)], date: &str) -> QpResult<String> {
    match format {
        ExportFormat::Text => Ok(render_text(selected)),
        ExportFormat::Html => Ok(render_html(date, selected)),
        ExportFormat::Json => render_json(selected),
    }
}

pub fn render_text(selected: &[(usize, &QuestionRecord)]) -> String {
    selected
        .iter()
        .map(|(n, q)| {
            let mut block = format!("Q{}. {}", n, q.text());
            for url in q.images() {
                block.push_str("\n[diagram] ");
                block.push_str(url);
            }
            block
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn render_json(selected: &[(usize, &QuestionRecord)]) -> QpResult<String> {
    let records: Vec<&QuestionRecord> = selected.iter().map(|(_, q)| *q).collect();
    Ok(serde_json::to_string_pretty(&records)?)
}

pub fn render_html(date: &str, selected: &[(usize, &QuestionRecord)]) -> String {
    let images: usize = selected.iter().map(|(_, q)| q.images().len()).sum();
    let mut html = format!(r#"<!DOCTYPE html>
<html lang="zh-CN">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>试题汇编 - {date}</title>
<style>
* {{ margin: 0; padding: 0; box-sizing: border-box; }}
body {{ font-family: -apple-system, "Segoe UI", Roboto, "Noto Sans SC", sans-serif; background: #f5f5f5; color: #333; line-height: 1.6; }}
.container {{ max-width: 1100px; margin: 0 auto; padding: 20px; }}
header {{ background: linear-gradient(135deg, #1a237e 0%, #283593 100%); color: white; padding: 40px 30px; border-radius: 12px; margin-bottom: 30px; }}
header h1 {{ font-size: 28px; margin-bottom: 8px; }}
header .meta {{ opacity: 0.85; font-size: 14px; }}
.question {{ background: white; border-radius: 12px; padding: 24px 30px; margin-bottom: 20px; box-shadow: 0 2px 8px rgba(0,0,0,0.08); }}
.question-stem {{ font-size: 18px; color: #1a237e; margin-bottom: 10px; }}
.question-no {{ font-weight: 700; margin-right: 6px; }}
.options {{ list-style: none; margin-left: 8px; }}
.options li {{ background: #fafafa; border-left: 3px solid #5c6bc0; padding: 6px 12px; margin-bottom: 6px; border-radius: 0 6px 6px 0; font-size: 15px; }}
.images-grid {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(280px, 1fr)); gap: 16px; margin-top: 14px; }}
.image-card {{ background: #f5f5f5; border-radius: 8px; overflow: hidden; }}
.image-card img {{ width: 100%; height: auto; display: block; }}
.image-card .caption {{ padding: 8px 12px; font-size: 12px; color: #666; word-break: break-all; }}
.empty {{ color: #999; font-style: italic; padding: 12px; }}
</style>
</head>
<body>
<div class="container">
<header>
  <h1>试题汇编</h1>
  <div class="meta">日期: {date} &nbsp;|&nbsp; 题目数: {count} &nbsp;|&nbsp; 配图: {images}</div>
</header>
"#, date = html_escape(date), count = selected.len(), images = images);

    if selected.is_empty() {
        html.push_str("<div class=\"empty\">没有可导出的题目</div>\n");
    }

    for (n, question) in selected {
        let mut lines = question.text().lines();
        let stem = lines.next().unwrap_or_default();

        html.push_str(&format!(
            r#"<div class="question">
<div class="question-stem"><span class="question-no">Q{n}.</span>{stem}</div>
"#,
            n = n,
            stem = html_escape(stem),
        ));

        let options: Vec<&str> = lines.collect();
        if !options.is_empty() {
            html.push_str("<ul class=\"options\">\n");
            for option in options {
                html.push_str(&format!("  <li>{}</li>\n", html_escape(option)));
            }
            html.push_str("</ul>\n");
        }

        if !question.images().is_empty() {
            html.push_str("<div class=\"images-grid\">\n");
            for (i, url) in question.images().iter().enumerate() {
                html.push_str(&format!(
                    r#"  <div class="image-card"><img src="{url}" alt="Q{n} 图{m}" loading="lazy"><div class="caption">{url}</div></div>
"#,
                    url = html_escape(url),
                    n = n,
                    m = i + 1,
                ));
            }
            html.push_str("</div>\n");
        }

        html.push_str("</div>\n");
    }

    html.push_str("</div>\n</body>\n</html>\n");
    html
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn load_json(path: &Path) -> QpResult<Vec<QuestionRecord>> {
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn write_output(path: &Path, content: &str) -> QpResult<()> {
    if let Some(dir) = path.parent() {
        if !dir.as_os_str().is_empty() {
            std::fs::create_dir_all(dir)?;
        }
    }
    std::fs::write(path, content)?;
    info!("已写出: {}", path.display());
    Ok(())
}
