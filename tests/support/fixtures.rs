//! Portal page fixtures.

pub const TOKEN: &str = "abc123";

pub fn login_form(token: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html><body id="page-login-index">
  <form class="login-form" action="/login/index.php" method="post" id="login">
    <input id="anchor" type="hidden" name="anchor" value="">
    <input type="hidden" name="logintoken" value="{token}">
    <input type="text" name="username" id="username" value="">
    <input type="password" name="password" id="password" value="">
    <button type="submit" id="loginbtn">Log in</button>
  </form>
</body></html>"#
    )
}

pub const DASHBOARD: &str = r#"<!DOCTYPE html>
<html><body id="page-my-index">
  <h1>Dashboard</h1>
  <div class="card dashboard-card" data-region="course-content">
    <a class="aalink coursename" href="/course/view.php?id=5"><span class="sr-only">Course name</span>Algorithms</a>
  </div>
  <div class="card dashboard-card" data-region="course-content">
    <a class="aalink coursename" href="/course/view.php?id=9">Databases</a>
  </div>
</body></html>"#;

pub const COURSE_PAGE: &str = r#"<!DOCTYPE html>
<html><body id="page-course-view-topics">
  <h1 class="h2">Algorithms</h1>
  <ul class="topics">
    <li id="section-0" class="section main clearfix">
      <div class="content">
        <h3 class="sectionname"><span><a href="/course/view.php?id=5#section-0">General</a></span></h3>
        <ul class="section img-text">
          <li class="activity resource modtype_resource" id="module-101">
            <a class="aalink" href="/mod/resource/view.php?id=101"><span class="instancename">Syllabus<span class="accesshide "> File</span></span></a>
          </li>
          <li class="activity forum modtype_forum" id="module-102">
            <a class="aalink" href="/mod/forum/view.php?id=102"><span class="instancename">Announcements<span class="accesshide "> Forum</span></span></a>
          </li>
        </ul>
      </div>
    </li>
    <li id="section-1" class="section main clearfix">
      <div class="content">
        <h3 class="sectionname">Week 1</h3>
        <ul class="section img-text"></ul>
      </div>
    </li>
  </ul>
</body></html>"#;

pub const CATEGORY_PAGE: &str = r#"<!DOCTYPE html>
<html><body id="page-course-index-category">
  <h1>Computer Science</h1>
  <div class="courses category-browse">
    <div class="coursebox"><h3 class="coursename"><a class="aalink" href="/course/view.php?id=12">Compilers</a></h3></div>
    <div class="coursebox"><h3 class="coursename"><a class="aalink" href="/course/view.php?id=13">Networks</a></h3></div>
  </div>
</body></html>"#;
