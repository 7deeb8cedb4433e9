use chrono::{DateTime, Utc};
use sc_core::{Article, User};

fn date(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub fn print_articles(articles: &[Article]) {
    if articles.is_empty() {
        println!("No articles");
        return;
    }
    for article in articles {
        let tags = if article.tags.is_empty() {
            String::new()
        } else {
            format!(" [{}]", article.tags.labels().join(", "))
        };
        println!("{:>6}  {}{}", article.id, article.title, tags);
    }
    println!("{} article(s)", articles.len());
}

pub fn print_article(article: &Article) {
    println!("#{} {}", article.id, article.title);
    if !article.source_url.is_empty() {
        println!("source:  {}", article.source_url);
    }
    if !article.tags.is_empty() {
        println!("tags:    {}", article.tags.labels().join(", "));
    }
    println!("created: {}", date(article.created_at));
    println!("updated: {}", date(article.updated_at));
    if article.has_summary() {
        println!("\n{}", article.summary.trim());
    }
    if !article.content.is_empty() {
        println!("\n{}", article.content);
    }
}

pub fn print_tags(tags: &[String]) {
    if tags.is_empty() {
        println!("No tags");
    } else {
        println!("{}", tags.join(", "));
    }
}

pub fn print_user(user: &User) {
    println!("{} (id {})", user.display_name(), user.id);
    println!("username: {}", user.username);
    if !user.email.is_empty() {
        println!("email:    {}", user.email);
    }
    println!("joined:   {}", date(user.created_at));
}
